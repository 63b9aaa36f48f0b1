use algoref_api_types::{AlgorithmCreate, AlgorithmUpdate, CodeTemplateCreate, CurrentUser};
use serde_json::json;
use tracing::debug;

use super::App;
use super::io::read_json;
use super::print::print_json;
use crate::config::{AdminCommand, AlgorithmsCommand, CategoriesCommand, LanguagesCommand, ListArgs};
use crate::error::AppError;
use crate::query::FilterPatch;
use crate::session::GuardView;

pub async fn algorithms(app: &App, command: AlgorithmsCommand) -> Result<(), AppError> {
    match command {
        AlgorithmsCommand::List(args) => {
            apply_list_args(app, &args);
            let state = app.controller.effective();
            debug!(params = ?app.controller.query_params(), "Listing algorithms");
            let page = app.catalog.list_algorithms(&state).await.into_result()?;
            print_json(&page)?;
        }
        AlgorithmsCommand::Show { slug } => {
            let algorithm = app.catalog.algorithm_by_slug(&slug).await.into_result()?;
            print_json(&algorithm)?;
        }
    }
    Ok(())
}

/// Filters first, then the explicit page, since a filter change resets it.
fn apply_list_args(app: &App, args: &ListArgs) {
    let filters = FilterPatch {
        search_text: args.search.clone(),
        category_id: args.category.map(Some),
        difficulty_id: args.difficulty.map(Some),
        page_size: args.size,
        sort_by: args.sort_by.map(Into::into),
        sort_order: args.order.map(Into::into),
        ..FilterPatch::default()
    };
    app.controller.set_filter(filters);
    app.controller.flush();

    if let Some(page) = args.page {
        app.controller.set_filter(FilterPatch::page(page));
    }
}

pub async fn categories(app: &App, command: CategoriesCommand) -> Result<(), AppError> {
    match command {
        CategoriesCommand::List => print_json(&app.catalog.categories().await.into_result()?)?,
        CategoriesCommand::Show { slug } => {
            print_json(&app.catalog.category_by_slug(&slug).await.into_result()?)?;
        }
    }
    Ok(())
}

pub async fn languages(app: &App, command: LanguagesCommand) -> Result<(), AppError> {
    match command {
        LanguagesCommand::List => print_json(&app.catalog.languages().await.into_result()?)?,
    }
    Ok(())
}

pub async fn login(app: &App, email: &str, password: &str) -> Result<(), AppError> {
    let tokens = app.auth.login(email, password).await?;
    print_json(&json!({
        "status": "signed_in",
        "token_type": tokens.token_type,
        "expires_in": tokens.expires_in,
    }))?;
    Ok(())
}

pub async fn logout(app: &App) -> Result<(), AppError> {
    app.auth.logout().await;
    print_json(&json!({ "status": "signed_out" }))?;
    Ok(())
}

pub async fn whoami(app: &App) -> Result<(), AppError> {
    let user = require_session(app).await?;
    print_json(&user)?;
    Ok(())
}

pub async fn refresh(app: &App) -> Result<(), AppError> {
    let tokens = app.auth.refresh().await?;
    print_json(&json!({
        "status": "refreshed",
        "expires_in": tokens.expires_in,
    }))?;
    Ok(())
}

pub async fn admin(app: &App, command: AdminCommand) -> Result<(), AppError> {
    require_session(app).await?;

    match command {
        AdminCommand::Create { file } => {
            let input: AlgorithmCreate = read_json(&file).await?;
            print_json(&app.mutations.create(&input).await?)?;
        }
        AdminCommand::Update { id, file } => {
            let patch: AlgorithmUpdate = read_json(&file).await?;
            print_json(&app.mutations.update(id, &patch).await?)?;
        }
        AdminCommand::Delete { id } => {
            app.mutations.delete(id).await?;
            print_json(&json!({ "status": "deleted", "id": id }))?;
        }
        AdminCommand::AddTemplate { id, file } => {
            let template: CodeTemplateCreate = read_json(&file).await?;
            print_json(&app.mutations.add_code_template(id, &template).await?)?;
        }
    }
    Ok(())
}

async fn require_session(app: &App) -> Result<CurrentUser, AppError> {
    match app.guard.mount().await {
        GuardView::Protected(user) => Ok(user),
        GuardView::Redirect(login_path) => Err(AppError::Unauthenticated { login_path }),
        GuardView::Loading => Err(AppError::Unauthenticated {
            login_path: app.guard.login_path().to_string(),
        }),
    }
}
