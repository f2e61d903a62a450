use clap::Args;

use crate::cli::ClientOptions;
use crate::{Key, RepositoryName, Result, Value};

/// Save value
#[derive(Args, Debug)]
pub struct SaveCommand {
    /// Repository name
    #[arg(value_name = "REPOSITORY")]
    repository: String,
    /// Key
    #[arg(value_name = "KEY")]
    key: String,
    /// Value, saved as a json string when it is not valid json
    #[arg(value_name = "VALUE")]
    value: String,
}

impl SaveCommand {
    pub async fn run(self, options: ClientOptions) -> Result<()> {
        let SaveCommand {
            repository,
            key,
            value,
        } = self;

        let repository = RepositoryName::new(repository)?;
        let key = Key::new(key)?;
        let value = parse_value(value);

        let mut client = crate::cli::connect(options).await?;
        client.save(repository, key, value).await?;
        println!("OK");

        Ok(())
    }
}

pub(crate) fn parse_value(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_falls_back_to_string() {
        assert_eq!(parse_value(r#"{"a": 1}"#.into()), json!({"a": 1}));
        assert_eq!(parse_value("10".into()), json!(10));
        assert_eq!(parse_value("XAU".into()), json!("XAU"));
    }
}
