//! Investigation tests against a real local model.
//!
//! These need `ollama` with the `llama3.1` model pulled and are excluded from
//! regular runs.
//!
//! Run with: `cargo test --test investigation -- --ignored`

use std::time::Duration;

use repair::candidate::CandidateGenerator;
use repair::core::extract::ExtractRules;
use repair::core::types::Context;
use repair::io::generator::CommandGenerator;
use repair::test_support::TempArtifact;

#[test]
#[ignore]
fn ollama_returns_extractable_candidate() {
    let temp = TempArtifact::new("add.py", "def add(a, b):\n    return a - b\n").expect("artifact");
    let generator = CommandGenerator::new(
        vec!["ollama".to_string(), "run".to_string(), "llama3.1".to_string()],
        temp.root().to_path_buf(),
        200_000,
    );
    let candidates = CandidateGenerator::new(
        "Fix add() so it returns the sum of its arguments.",
        ExtractRules::new(vec!["def add".to_string()]),
        Duration::from_secs(300),
    )
    .expect("adapter");
    let context = Context {
        artifact: temp.read().expect("read"),
        feedback: "FAILED test_add.py::test_add - assert -1 == 3\n1 failed in 0.01s".to_string(),
    };

    let candidate = candidates
        .generate(&generator, &context, 0.0)
        .expect("candidate");

    println!("{}", candidate.content);
    assert!(candidate.content.contains("def add"));
}
