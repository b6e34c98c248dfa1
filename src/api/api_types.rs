//! Wire envelopes returned by the stacks API.

use serde::Deserialize;

use super::types::StackRecord;

/// Response of `GET /stacks`
#[derive(Debug, Deserialize)]
pub struct ApiListResponse {
  pub data: Vec<StackRecord>,
}

/// Response of create/update. Servers return either the bare record or the
/// record wrapped in `data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiRecordResponse {
  Wrapped { data: StackRecord },
  Bare(StackRecord),
}

impl ApiRecordResponse {
  pub fn into_record(self) -> StackRecord {
    match self {
      ApiRecordResponse::Wrapped { data } => data,
      ApiRecordResponse::Bare(record) => record,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_list_keeps_server_order() {
    let json = r#"{"data":[
      {"id":2,"name":"B","image":"b.png","createdAt":"2024-01-02T00:00:00Z"},
      {"id":1,"name":"A","image":"a.png","createdAt":"2024-01-01T00:00:00Z"}
    ]}"#;
    let response: ApiListResponse = serde_json::from_str(json).unwrap();
    let ids: Vec<u64> = response.data.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![2, 1]);
  }

  #[test]
  fn test_record_response_shapes() {
    let bare = r#"{"id":3,"name":"C","image":"c.png","createdAt":"2024-01-03T00:00:00Z"}"#;
    let wrapped = format!(r#"{{"data":{}}}"#, bare);

    let a: ApiRecordResponse = serde_json::from_str(bare).unwrap();
    let b: ApiRecordResponse = serde_json::from_str(&wrapped).unwrap();
    assert_eq!(a.into_record(), b.into_record());
  }
}
