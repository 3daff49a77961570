//! JSON bodies exchanged with the copyright lookup service.

use serde::{Deserialize, Deserializer, Serialize};

use crate::models::Publication;

/// One publication as the service expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequestItem {
    pub author: String,
    pub book_title: Option<String>,
    pub publisher: String,
    pub publish_year: String,
    pub additional_info: Option<String>,
    /// Present for serials only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_title: Option<String>,
}

impl From<&Publication> for SearchRequestItem {
    fn from(record: &Publication) -> Self {
        Self {
            author: record.author.clone(),
            book_title: record.book_title.clone(),
            publisher: record.publisher.clone(),
            publish_year: record.publish_year.clone(),
            additional_info: record.additional_info.clone(),
            article_title: record.article_title.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest<'a> {
    pub items: &'a [SearchRequestItem],
}

/// The service's own copyright verdict, when it sends one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CopyrightInfo {
    pub code: Option<String>,
    pub has_copyright: Option<bool>,
    pub reason: Option<String>,
}

/// Metadata found for one publication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LookupResult {
    /// Position of the item in the request, set by the batch endpoint.
    pub index: Option<usize>,
    pub author_type: Option<String>,
    pub birth_year: Option<String>,
    pub death_year: Option<String>,
    pub control_number: Option<String>,
    pub isni: Option<String>,
    pub last_affiliation: Option<String>,
    pub remark: Option<String>,
    pub web_search_utilized: Option<bool>,
    pub is_author_unknown: Option<bool>,
    pub copyright_info: Option<CopyrightInfo>,
}

/// Response of both endpoints: what was found and which positions failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub success_items: Vec<LookupResult>,
    #[serde(deserialize_with = "null_as_default")]
    pub failed_indices: Vec<usize>,
}

/// An explicit `null` decodes like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldKey, FieldValues, PublicationKind};

    #[test]
    fn monograph_items_omit_article_title() {
        let values: FieldValues = [
            (FieldKey::Author, "박목월".to_string()),
            (FieldKey::BookTitle, "Poems".to_string()),
            (FieldKey::PublishYear, "20080401".to_string()),
        ]
        .into_iter()
        .collect();
        let record = Publication::from_fields(PublicationKind::Monograph, &values);
        let json = serde_json::to_value(SearchRequestItem::from(&record)).expect("serialize");

        assert_eq!(json["author"], "박목월");
        assert_eq!(json["bookTitle"], "Poems");
        assert_eq!(json["publishYear"], "20080401");
        assert!(json["additionalInfo"].is_null());
        assert!(json.get("articleTitle").is_none());
    }

    #[test]
    fn serial_items_carry_article_title() {
        let values: FieldValues = [(FieldKey::ArticleTitle, "Essay".to_string())]
            .into_iter()
            .collect();
        let record = Publication::from_fields(PublicationKind::Serial, &values);
        let json = serde_json::to_value(SearchRequestItem::from(&record)).expect("serialize");
        assert_eq!(json["articleTitle"], "Essay");
    }

    #[test]
    fn response_tolerates_missing_fields() {
        let body = r#"{
            "successItems": [
                {
                    "index": 1,
                    "authorType": "개인",
                    "deathYear": "1978",
                    "webSearchUtilized": true,
                    "copyrightInfo": { "code": "C1", "has_copyright": true, "reason": "died 1978" }
                }
            ],
            "failedIndices": [0]
        }"#;
        let response: SearchResponse = serde_json::from_str(body).expect("parse");
        assert_eq!(response.failed_indices, vec![0]);
        let item = &response.success_items[0];
        assert_eq!(item.index, Some(1));
        assert_eq!(item.death_year.as_deref(), Some("1978"));
        assert_eq!(item.birth_year, None);
        assert_eq!(item.web_search_utilized, Some(true));
        assert_eq!(
            item.copyright_info.as_ref().and_then(|info| info.reason.as_deref()),
            Some("died 1978")
        );
    }

    #[test]
    fn explicit_nulls_decode_like_missing_fields() {
        let body = r#"{
            "successItems": [
                {
                    "authorType": "단체",
                    "controlNumber": null,
                    "copyrightInfo": { "code": "PD", "has_copyright": false, "reason": null }
                }
            ],
            "failedIndices": null
        }"#;
        let response: SearchResponse = serde_json::from_str(body).expect("parse");
        assert!(response.failed_indices.is_empty());
        let item = &response.success_items[0];
        assert_eq!(item.author_type.as_deref(), Some("단체"));
        assert_eq!(item.control_number, None);
        let info = item.copyright_info.as_ref().expect("copyright info");
        assert_eq!(info.code.as_deref(), Some("PD"));
        assert_eq!(info.reason, None);

        let response: SearchResponse =
            serde_json::from_str(r#"{"successItems": null, "failedIndices": [2]}"#).expect("parse");
        assert!(response.success_items.is_empty());
        assert_eq!(response.failed_indices, vec![2]);
    }

    #[test]
    fn empty_object_is_an_empty_response() {
        let response: SearchResponse = serde_json::from_str("{}").expect("parse");
        assert!(response.success_items.is_empty());
        assert!(response.failed_indices.is_empty());
    }
}
