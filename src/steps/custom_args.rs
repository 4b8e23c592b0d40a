//! Custom arguments step - extra arguments for toolchain commands
//!
//! The step itself performs no action: its parsed token list is inert
//! until the build or run pipeline harvests it and appends the tokens to
//! the toolchain command line.

use crate::core::config::StepSpec;
use crate::core::context::ExecutionContext;
use crate::core::log::LogSink;
use crate::steps::{
    ConfigField, ConfigFieldKind, StepConfig, StepDescriptor, StepResult, WorkflowStep,
};
use async_trait::async_trait;
use serde_json::{Map, Value};

pub const STEP_TYPE: &str = "custom_args";

pub struct CustomArgsStep {
    config: StepConfig,
    log: LogSink,
}

pub fn create(config: StepConfig, log: LogSink) -> Box<dyn WorkflowStep> {
    Box::new(CustomArgsStep { config, log })
}

pub fn descriptor() -> StepDescriptor {
    StepDescriptor {
        step_type: STEP_TYPE,
        display_name: "Custom Arguments",
        description: "Add custom arguments to the build/run command",
        category: "build",
        config_fields: vec![ConfigField::new(
            "arguments",
            "Arguments",
            ConfigFieldKind::Textarea,
        )
        .description("Arguments to append to the toolchain command (space or newline separated)")
        .placeholder("--obfuscate\n--dart-define=FLAVOR=prod\n--split-debug-info=build/debug")],
    }
}

#[async_trait]
impl WorkflowStep for CustomArgsStep {
    fn validate(&self) -> Result<(), String> {
        // No required fields
        Ok(())
    }

    async fn execute(&self, _context: &ExecutionContext) -> StepResult {
        let arguments = parse_arguments(self.config.str("arguments").unwrap_or(""));

        if arguments.is_empty() {
            self.log.info("No custom arguments configured");
        } else {
            self.log
                .info(&format!("Custom arguments: {}", arguments.join(" ")));
        }

        let mut output = Map::new();
        output.insert(
            "arguments".to_string(),
            Value::Array(arguments.into_iter().map(Value::String).collect()),
        );
        StepResult::ok_with("Custom arguments configured", output)
    }
}

/// Parse an argument blob into a token list.
///
/// Space- and newline-separated, quote-aware: single or double quotes
/// preserve internal whitespace. An unterminated quote consumes the rest
/// of the input literally.
pub fn parse_arguments(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;

    for ch in raw.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                c => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Collect the parsed tokens of every custom-arguments step in the list,
/// concatenated in list order. Reads the step configs directly, so the
/// harvest works without executing the steps.
pub fn extract_arguments(steps: &[StepSpec]) -> Vec<String> {
    steps
        .iter()
        .filter(|spec| spec.step_type == STEP_TYPE)
        .flat_map(|spec| {
            parse_arguments(spec.config.get("arguments").and_then(Value::as_str).unwrap_or(""))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_space_and_newline_separated() {
        assert_eq!(
            parse_arguments("--flag1 --flag2=val\n--flag3"),
            ["--flag1", "--flag2=val", "--flag3"]
        );
    }

    #[test]
    fn test_parse_empty_and_whitespace() {
        assert!(parse_arguments("").is_empty());
        assert!(parse_arguments("   \n  \t ").is_empty());
    }

    #[test]
    fn test_parse_quoted_tokens_preserve_spaces() {
        assert_eq!(
            parse_arguments(r#"--name "My App" --flavor=prod"#),
            ["--name", "My App", "--flavor=prod"]
        );
        assert_eq!(parse_arguments("--title 'a b c'"), ["--title", "a b c"]);
    }

    #[test]
    fn test_parse_unterminated_quote_consumes_rest() {
        assert_eq!(parse_arguments(r#"--name "My App"#), ["--name", "My App"]);
    }

    #[test]
    fn test_extract_concatenates_in_list_order() {
        let steps: Vec<StepSpec> = serde_json::from_value(json!([
            {"id": "a", "type": "custom_args", "config": {"arguments": "--one --two"}},
            {"id": "b", "type": "run_script", "config": {"script": "true"}},
            {"id": "c", "type": "custom_args", "config": {"arguments": "--three"}}
        ]))
        .unwrap();

        assert_eq!(extract_arguments(&steps), ["--one", "--two", "--three"]);
    }

    #[test]
    fn test_extract_ignores_other_step_types() {
        let steps: Vec<StepSpec> = serde_json::from_value(json!([
            {"id": "a", "type": "run_script", "config": {"script": "echo --fake"}}
        ]))
        .unwrap();
        assert!(extract_arguments(&steps).is_empty());
    }

    #[tokio::test]
    async fn test_execute_reports_parsed_arguments() {
        let config = StepConfig::new(
            json!({"arguments": "--verbose"}).as_object().unwrap().clone(),
        );
        let step = create(config, LogSink::noop());
        assert!(step.validate().is_ok());

        let ctx = sample_context();
        let result = step.execute(&ctx).await;
        assert!(result.success);
        let output = result.output.unwrap();
        assert_eq!(output["arguments"], json!(["--verbose"]));
    }

    fn sample_context() -> ExecutionContext {
        ExecutionContext::new(
            "proj1",
            std::path::PathBuf::from("/tmp"),
            serde_json::from_value(json!({
                "id": "app1",
                "projectId": "proj1",
                "appName": "Demo",
            }))
            .unwrap(),
            uuid::Uuid::new_v4(),
        )
    }
}
