use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::error::ApiError;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output a list of rows; text mode prints one line per row via `line`.
pub fn output_collection<T>(
    output_format: &OutputFormat,
    collection_name: &str,
    rows: &[T],
    empty_message: &str,
    line: impl Fn(&T) -> String,
) -> anyhow::Result<()>
where
    T: serde::Serialize,
{
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ collection_name: rows }))?);
        }
        OutputFormat::Text if rows.is_empty() => println!("{}", empty_message),
        OutputFormat::Text => {
            for row in rows {
                println!("{}", line(row));
            }
        }
    }
    Ok(())
}

/// Validation failures keep their field messages; everything else its message.
pub fn describe_api_error(err: ApiError) -> anyhow::Error {
    match err {
        ApiError::ValidationError { field_errors: Some(fields), .. } => {
            let details = fields
                .iter()
                .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
                .collect::<Vec<_>>()
                .join("; ");
            anyhow::anyhow!("invalid record ({})", details)
        }
        other => anyhow::anyhow!(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::FieldErrors;

    #[test]
    fn field_errors_survive_into_the_message() {
        let mut errors = FieldErrors::default();
        errors.add("country", "Ensure this field has at least 2 characters.");
        let message = describe_api_error(errors.into()).to_string();
        assert_eq!(message, "invalid record (country: Ensure this field has at least 2 characters.)");
    }
}
