use serde::Serialize;

use crate::infra::error::InfraError;

pub fn print_json<T: Serialize>(value: &T) -> Result<(), InfraError> {
    let out = serde_json::to_string_pretty(value).map_err(|err| {
        InfraError::configuration(format!("failed to render output: {err}"))
    })?;
    println!("{out}");
    Ok(())
}
