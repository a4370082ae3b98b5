//! Request builders and response mapping for each translation backend

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::TranslationError;

/// Demo translation: non-blank lines get a ` [<target>]` suffix
pub fn demo_translate(texts: &[String], target: &str) -> Vec<String> {
    let suffix = format!(" [{}]", target);
    texts
        .iter()
        .map(|t| {
            if t.trim().is_empty() {
                t.clone()
            } else {
                format!("{}{}", t, suffix)
            }
        })
        .collect()
}

/// Map a UI language code to DeepL's code
pub fn deepl_language(code: &str) -> String {
    let code = code.trim().to_lowercase();
    match code.as_str() {
        "" => "EN".to_string(),
        "auto" => "auto".to_string(),
        other => other.to_uppercase(),
    }
}

/// Form fields for a DeepL request; one `text` field per input line
pub fn deepl_form(
    auth_key: &str,
    texts: &[String],
    source: &str,
    target: &str,
) -> Vec<(&'static str, String)> {
    let mut form = Vec::with_capacity(texts.len() + 3);
    form.push(("auth_key", auth_key.to_string()));
    form.extend(texts.iter().map(|t| ("text", t.clone())));
    form.push(("target_lang", deepl_language(target)));

    let source = deepl_language(source);
    if !source.eq_ignore_ascii_case("auto") {
        form.push(("source_lang", source));
    }
    form
}

/// JSON body for the generic backend
#[derive(Debug, Serialize)]
pub struct GenericRequest<'a> {
    pub texts: &'a [String],
    pub source: &'a str,
    pub target: &'a str,
}

impl<'a> GenericRequest<'a> {
    pub fn new(texts: &'a [String], source: &'a str, target: &'a str) -> Self {
        let source = if source.trim().is_empty() { "auto" } else { source };
        Self {
            texts,
            source,
            target,
        }
    }
}

/// Send a request and decode the JSON body, mapping transport and status errors
pub(super) async fn post(request: reqwest::RequestBuilder) -> Result<Value, TranslationError> {
    let response = request
        .send()
        .await
        .map_err(|e| TranslationError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("Translation backend returned {}", status);
        return Err(TranslationError::Http {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| TranslationError::InvalidResponse(e.to_string()))
}

fn translations_array(body: &Value) -> Result<&Vec<Value>, TranslationError> {
    body.get("translations")
        .and_then(Value::as_array)
        .ok_or_else(|| TranslationError::InvalidResponse("missing `translations` list".into()))
}

fn check_length(result: Vec<String>, expected: usize) -> Result<Vec<String>, TranslationError> {
    if result.len() != expected {
        return Err(TranslationError::LengthMismatch {
            expected,
            got: result.len(),
        });
    }
    Ok(result)
}

/// `{"translations": [{"text": "..."}]}`
pub fn parse_deepl_response(body: &Value, expected: usize) -> Result<Vec<String>, TranslationError> {
    let result = translations_array(body)?
        .iter()
        .map(|item| {
            item.get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        })
        .collect();
    check_length(result, expected)
}

/// `{"translations": ["..."]}`
pub fn parse_generic_response(body: &Value, expected: usize) -> Result<Vec<String>, TranslationError> {
    let result = translations_array(body)?
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    check_length(result, expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_demo_translate_is_deterministic() {
        let texts = strings(&["uno", "", "dos"]);
        assert_eq!(demo_translate(&texts, "en"), strings(&["uno [en]", "", "dos [en]"]));
        assert_eq!(demo_translate(&texts, "en"), demo_translate(&texts, "en"));
    }

    #[test]
    fn test_deepl_language() {
        assert_eq!(deepl_language("es"), "ES");
        assert_eq!(deepl_language("AUTO"), "auto");
        assert_eq!(deepl_language("nl"), "NL");
        assert_eq!(deepl_language(""), "EN");
    }

    #[test]
    fn test_deepl_form_omits_auto_source() {
        let texts = strings(&["Hola", "mundo"]);
        let form = deepl_form("secret", &texts, "auto", "en");

        assert_eq!(
            form,
            vec![
                ("auth_key", "secret".to_string()),
                ("text", "Hola".to_string()),
                ("text", "mundo".to_string()),
                ("target_lang", "EN".to_string()),
            ]
        );

        let form = deepl_form("secret", &texts, "es", "en");
        assert_eq!(form.last().unwrap(), &("source_lang", "ES".to_string()));
    }

    #[test]
    fn test_generic_request_body() {
        let texts = strings(&["a"]);
        let body = serde_json::to_value(GenericRequest::new(&texts, " ", "fr")).unwrap();
        assert_eq!(body, json!({"texts": ["a"], "source": "auto", "target": "fr"}));
    }

    #[test]
    fn test_parse_deepl_response() {
        let body = json!({"translations": [{"detected_source_language": "ES", "text": "Hello"}, {"text": "world"}]});
        assert_eq!(parse_deepl_response(&body, 2).unwrap(), strings(&["Hello", "world"]));
    }

    #[test]
    fn test_parse_rejects_length_mismatch() {
        let body = json!({"translations": ["only one"]});
        let err = parse_generic_response(&body, 2).unwrap_err();
        assert!(matches!(err, TranslationError::LengthMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn test_parse_rejects_bad_shape() {
        let body = json!({"result": ["x"]});
        assert!(matches!(
            parse_generic_response(&body, 1),
            Err(TranslationError::InvalidResponse(_))
        ));
        let body = json!({"translations": "x"});
        assert!(matches!(
            parse_deepl_response(&body, 1),
            Err(TranslationError::InvalidResponse(_))
        ));
    }
}
