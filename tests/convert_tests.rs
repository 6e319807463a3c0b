use anyhow::Result;
use convoset::data::{self, convert};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn sharegpt_file_converts_to_messages() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("in.jsonl");
    let output = dir.path().join("out.jsonl");

    let rows = vec![
        json!({"conversations": [
            {"from": "human", "value": "Hello"},
            {"from": "gpt", "value": "Hi there!"}
        ]}),
        json!({"id": "keep-me", "conversations": [
            {"from": "system", "value": "Be terse"},
            ["human", "ok"]
        ]}),
    ];
    data::write_jsonl(&input, &rows)?;

    let converted = data::load_values(&input)?
        .into_iter()
        .map(convert::process_row)
        .collect::<Result<Vec<_>>>()?;
    data::write_jsonl(&output, &converted)?;

    let back = data::load_values(&output)?;
    assert_eq!(
        back[0]["messages"],
        json!([
            {"role": "user", "content": "Hello"},
            {"role": "assistant", "content": "Hi there!"}
        ])
    );
    assert_eq!(back[1]["id"], json!("keep-me"));
    assert_eq!(back[1]["messages"][0]["role"], json!("system"));
    assert_eq!(back[1]["messages"][1]["role"], json!("user"));
    assert!(back[0].get("conversations").is_none());
    Ok(())
}

#[test]
fn rows_without_conversations_pass_through() -> Result<()> {
    let row = json!({"messages": [{"role": "user", "content": "hi"}], "score": 3});
    let out = convert::process_row(row.clone())?;
    assert_eq!(out, row);
    Ok(())
}

#[test]
fn nested_transform_writes_system_first() -> Result<()> {
    let row = json!({
        "conv_id": "9",
        "messages": {"messages": [
            {"role": "user", "content": "Hello"},
            {"role": "system", "content": "You are a helpful assistant."},
            {"role": "assistant", "content": "Hi there!"}
        ]}
    });
    let out = convert::normalize_nested(&row)?;
    let roles: Vec<&str> = out["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["system", "user", "assistant"]);
    Ok(())
}

#[test]
fn strip_trailing_user_round_trips_through_files() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("in.jsonl");
    let output = dir.path().join("out.jsonl");

    let rows = vec![
        json!({"messages": [
            {"role": "system", "content": "s"},
            {"role": "user", "content": "q"},
            {"role": "assistant", "content": "a"},
            {"role": "user", "content": "dangling"}
        ]}),
        json!({"messages": [
            {"role": "user", "content": "q"},
            {"role": "assistant", "content": "a"}
        ], "conv_id": 7}),
    ];
    data::write_jsonl(&input, &rows)?;

    let mut loaded = data::load_values(&input)?;
    for row in &mut loaded {
        convert::strip_trailing_user(row);
    }
    data::write_jsonl(&output, &loaded)?;

    let back = data::load_values(&output)?;
    assert_eq!(back[0]["messages"].as_array().unwrap().len(), 3);
    assert_eq!(back[1]["messages"].as_array().unwrap().len(), 2);
    assert_eq!(back[1]["conv_id"], json!(7), "other fields are untouched");
    Ok(())
}
