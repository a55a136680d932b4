use std::sync::Arc;

use pramana_core::{
    from_async_fn, ConjugatedFormScorer, Eval, IdentificationScorer, JsonlDataSource, Scorer,
    TestCase, VecDataSource,
};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Example 1: grade one answer directly
    let item = json!({
        "difficulty": "medium",
        "expected_answer": {
            "author": "abhinavagupta", "work": "tantraloka", "book": "1",
            "chapter": "prathamamahnika", "verse": "42", "confidence": 1.0
        }
    });
    let answer = r#"{"author": "Abhinavagupta", "work": "Tantrāloka", "book": "1",
        "chapter": "prathamamahnika", "verse": "43", "confidence": 0.7}"#;
    let scorer = IdentificationScorer::default();
    println!("identification score: {:.3}", scorer.grade_item(&item, answer));

    // Example 2: a small evaluation with a stand-in task
    let cases = vec![
        TestCase::with_id("bhu", json!("bhū"), json!({ "expected_answer": "bhavati" })),
        TestCase::with_id("gam", json!("gam"), json!({ "expected_answer": "gacchati" })),
    ];
    let task = from_async_fn(|input| {
        let root = input.as_str().unwrap_or_default().to_string();
        async move {
            let form = if root == "bhū" { "bhavati" } else { "gamati" };
            Ok(json!(format!("{{\"conjugated_verb\": \"{form}\"}}")))
        }
    });
    let scorers: Vec<Arc<dyn Scorer>> = vec![Arc::new(ConjugatedFormScorer)];
    let result = Eval::builder()
        .data_source(Arc::new(VecDataSource::new(cases)))
        .task(task)
        .scorers(scorers)
        .build()?
        .run()
        .await?;
    println!("{}", result.summary_table());

    // Example 3: baseline an empty answer on a dataset split, if provided
    if let Some(path) = std::env::args().nth(1) {
        let result = Eval::builder()
            .data_source(Arc::new(JsonlDataSource::new(path).limit(20)))
            .task(from_async_fn(|_input| async move { Ok(json!("{}")) }))
            .add_scorer(Arc::new(IdentificationScorer::default()))
            .build()?
            .run()
            .await?;
        println!("{}", result.summary_table());
    }

    Ok(())
}
