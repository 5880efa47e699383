use testscribe_core::{Annotation, ContextMode, TestUnit};

#[test]
fn collector_json_deserializes_with_defaults() {
    let test: TestUnit = serde_json::from_str(
        r#"{
            "nodeid": "tests/test_calc.py::test_divide[zero]",
            "source": "def test_divide(x):\n    assert calc.divide(1, x)\n",
            "covered_files": [{"path": "calc.py", "lines": [3, 4]}],
            "context_mode": "balanced"
        }"#,
    )
    .unwrap();

    assert_eq!(test.base_nodeid(), "tests/test_calc.py::test_divide");
    assert!(!test.opt_out());
    assert!(test.context().is_empty());
    assert_eq!(*test.context_mode(), Some(ContextMode::Balanced));
    assert_eq!(test.covered_files()[0].lines(), &vec![3, 4]);
}

#[test]
fn error_annotation_serializes_without_confidence() {
    let annotation = Annotation::failed("Network error: connection refused");
    let json = serde_json::to_value(&annotation).unwrap();

    assert_eq!(json["error"], "Network error: connection refused");
    assert!(json.get("confidence").is_none());
}
