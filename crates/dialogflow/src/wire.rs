//! JSON bodies of the `detectIntent` REST call.
//!
//! Parameter values stay as [`serde_json::Value`]: in the JSON mapping the
//! service's tagged `Value` kinds are exactly the JSON kinds.

use chatbot_core::{DetectionResult, Query};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectIntentRequest {
    pub query_input: QueryInput,
    pub query_params: QueryParameters,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryInput {
    pub text: TextInput,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextInput {
    pub text: String,
    pub language_code: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameters {
    pub time_zone: String,
}

impl From<&Query> for DetectIntentRequest {
    fn from(query: &Query) -> Self {
        Self {
            query_input: QueryInput {
                text: TextInput {
                    text: query.text.clone(),
                    language_code: query.language_code.clone(),
                },
            },
            query_params: QueryParameters { time_zone: query.time_zone.clone() },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectIntentResponse {
    pub response_id: String,
    pub query_result: Option<QueryResult>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryResult {
    pub query_text: String,
    pub language_code: String,
    pub intent: Option<Intent>,
    pub intent_detection_confidence: Option<f64>,
    pub parameters: Option<Map<String, Value>>,
    pub fulfillment_text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Intent {
    pub name: String,
    pub display_name: String,
}

/// `{"error": {"code": 400, "message": "...", "status": "INVALID_ARGUMENT"}}`
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ErrorEnvelope {
    pub error: ErrorStatus,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ErrorStatus {
    pub code: u16,
    pub message: String,
    pub status: String,
}

impl DetectIntentResponse {
    pub fn into_detection(self) -> DetectionResult {
        let Some(result) = self.query_result else {
            return DetectionResult::default();
        };

        DetectionResult {
            intent_name: result.intent.map(|intent| intent.display_name),
            confidence: result.intent_detection_confidence.unwrap_or_default(),
            parameters: result.parameters.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chatbot_core::{Query, SessionId};
    use serde_json::json;

    use super::{DetectIntentRequest, DetectIntentResponse};

    #[test]
    fn request_body_uses_the_service_field_names() {
        let query = Query {
            text: "hello".to_string(),
            language_code: "en".to_string(),
            session_id: SessionId::from_user_id("testUser").expect("valid user id"),
            time_zone: "America/Montevideo".to_string(),
        };

        let body = serde_json::to_value(DetectIntentRequest::from(&query)).expect("serializable");

        assert_eq!(
            body,
            json!({
                "queryInput": {"text": {"text": "hello", "languageCode": "en"}},
                "queryParams": {"timeZone": "America/Montevideo"}
            })
        );
    }

    #[test]
    fn full_response_maps_to_detection() {
        let response: DetectIntentResponse = serde_json::from_value(json!({
            "responseId": "r-1",
            "queryResult": {
                "queryText": "5 kg of rice",
                "languageCode": "en",
                "intent": {"name": "projects/p/agent/intents/abc", "displayName": "order"},
                "intentDetectionConfidence": 0.75,
                "parameters": {"weight": {"amount": 5, "unit": "kg"}},
                "fulfillmentText": "Sure"
            }
        }))
        .expect("decodes");

        let detection = response.into_detection();

        assert_eq!(detection.intent_name.as_deref(), Some("order"));
        assert_eq!(detection.confidence, 0.75);
        assert_eq!(detection.parameters["weight"], json!({"amount": 5, "unit": "kg"}));
    }

    #[test]
    fn missing_intent_and_parameters_decode_as_absent() {
        let response: DetectIntentResponse =
            serde_json::from_value(json!({"responseId": "r-2", "queryResult": {"queryText": "?"}}))
                .expect("decodes");

        let detection = response.into_detection();

        assert_eq!(detection.intent_name, None);
        assert_eq!(detection.confidence, 0.0);
        assert!(detection.parameters.is_empty());
    }

    #[test]
    fn empty_body_decodes_to_empty_detection() {
        let response: DetectIntentResponse = serde_json::from_str("{}").expect("decodes");
        assert_eq!(response.into_detection(), Default::default());
    }
}
