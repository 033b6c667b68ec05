//! End-to-end tests for the ProtocolAnalyzer

#[cfg(test)]
mod tests {
    use crate::{
        AnalysisRequest, AnalyzerConfig, AnalyzerError, ImproveOutcome, ProtocolAnalyzer,
        HEALTH_CHECK_PROMPT,
    };
    use improver_domain::traits::AnalysisStore;
    use improver_domain::{AnalysisId, Priority};
    use improver_llm::MockProvider;
    use improver_store::InMemoryStore;
    use std::io::{Cursor, Write};
    use std::time::Duration;

    const PROTOCOL: &str = "PCR Amplification\n1. Mix all reagents\n2. Put in thermocycler";

    const REVIEW: &str = r#"Sure, here is the review:
{
    "summary": "Workable but vague",
    "overall_score": "5",
    "total_issues": "3",
    "suggestions": [
        {"category": "formatting", "priority": "LOW", "location": "Title", "issue": "No version", "suggestion": "Add a version number"},
        {"category": "safety", "priority": "HIGH", "location": "Step 1", "issue": "No PPE", "suggestion": "Wear gloves"},
        {"category": "clarity", "priority": "MEDIUM", "location": "Step 2", "issue": "No program", "suggestion": "State cycling temperatures"}
    ]
}"#;

    fn analyzer(llm: MockProvider) -> ProtocolAnalyzer<MockProvider, InMemoryStore> {
        ProtocolAnalyzer::new(llm, InMemoryStore::new(), AnalyzerConfig::default())
    }

    fn docx(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
            .collect();
        let xml = format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[tokio::test]
    async fn test_full_analysis_flow() {
        let llm = MockProvider::new(REVIEW);
        let analyzer = analyzer(llm.clone());

        let report = analyzer
            .analyze(AnalysisRequest {
                document: docx(&["PCR Amplification", "1. Mix all reagents"]),
                filename: "pcr.docx".to_string(),
                stored_filename: "20240101_120000_pcr.docx".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(report.filename, "pcr.docx");
        assert_eq!(report.result.summary, "Workable but vague");
        assert_eq!(report.result.total_issues, 3);
        assert!(report
            .analysis_id
            .as_str()
            .starts_with("20240101_120000_pcr.docx_"));

        assert_eq!(report.metadata.model_used, AnalyzerConfig::default().model);
        assert_eq!(
            report.metadata.protocol_length,
            "PCR Amplification\n1. Mix all reagents".chars().count()
        );
        assert!(report.metadata.tokens_used > 0);

        let request = llm.last_request().unwrap();
        assert!(request.prompt.contains("Protocol File: pcr.docx"));
        assert!(request.prompt.contains("1. Mix all reagents"));
        assert_eq!(request.max_tokens, 4000);

        assert_eq!(analyzer.cached_analyses().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_suggestions_returned_by_priority() {
        let analyzer = analyzer(MockProvider::new(REVIEW));
        let report = analyzer
            .analyze_text(PROTOCOL.to_string(), "pcr.pdf", "s_pcr.pdf")
            .await
            .unwrap();

        let priorities: Vec<_> = report
            .result
            .suggestions
            .iter()
            .map(|s| s.priority.clone())
            .collect();
        assert_eq!(priorities, vec![Priority::High, Priority::Medium, Priority::Low]);

        // The cache holds the sorted list, so indices refer to this order
        let record = analyzer
            .store()
            .get(&report.analysis_id)
            .unwrap()
            .unwrap();
        assert_eq!(record.result.suggestions, report.result.suggestions);
        assert_eq!(record.original_text, PROTOCOL);
    }

    #[tokio::test]
    async fn test_unsupported_format_makes_no_model_call() {
        let llm = MockProvider::new(REVIEW);
        let analyzer = analyzer(llm.clone());

        let result = analyzer
            .analyze(AnalysisRequest {
                document: b"plain text".to_vec(),
                filename: "notes.txt".to_string(),
                stored_filename: "s_notes.txt".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AnalyzerError::UnsupportedFormat(ref ext)) if ext == ".txt"));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_document_fails_extraction() {
        let llm = MockProvider::new(REVIEW);
        let analyzer = analyzer(llm.clone());

        let result = analyzer
            .analyze(AnalysisRequest {
                document: docx(&["", "  "]),
                filename: "blank.docx".to_string(),
                stored_filename: "s_blank.docx".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AnalyzerError::ExtractionFailed(_))));
        assert_eq!(llm.call_count(), 0);
        assert_eq!(analyzer.cached_analyses().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unstructured_response_is_cached() {
        let analyzer = analyzer(MockProvider::new("The protocol looks fine to me."));
        let report = analyzer
            .analyze_text(PROTOCOL.to_string(), "pcr.pdf", "s_pcr.pdf")
            .await
            .unwrap();

        assert!(report.result.suggestions.is_empty());
        assert_eq!(
            report.result.raw_response.as_deref(),
            Some("The protocol looks fine to me.")
        );
        assert_eq!(analyzer.cached_analyses().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_malformed_response_is_an_error() {
        let analyzer = analyzer(MockProvider::new(r#"{"summary": "oops", "suggestions": [}"#));
        let result = analyzer
            .analyze_text(PROTOCOL.to_string(), "pcr.pdf", "s_pcr.pdf")
            .await;

        assert!(matches!(result, Err(AnalyzerError::ResponseMalformed(_))));
        assert_eq!(analyzer.cached_analyses().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_model_error_is_surfaced() {
        let llm = MockProvider::default();
        llm.push_error("upstream 500");
        let analyzer = analyzer(llm);

        let result = analyzer
            .analyze_text(PROTOCOL.to_string(), "pcr.pdf", "s_pcr.pdf")
            .await;

        match result {
            Err(AnalyzerError::ModelCallFailed(message)) => assert!(message.contains("upstream 500")),
            other => panic!("expected ModelCallFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_model_timeout() {
        let llm = MockProvider::new(REVIEW).with_delay(Duration::from_secs(3));
        let config = AnalyzerConfig {
            model_timeout_secs: 1,
            ..AnalyzerConfig::default()
        };
        let analyzer = ProtocolAnalyzer::new(llm, InMemoryStore::new(), config);

        let result = analyzer
            .analyze_text(PROTOCOL.to_string(), "pcr.pdf", "s_pcr.pdf")
            .await;
        assert!(matches!(result, Err(AnalyzerError::Timeout(1))));
    }

    #[tokio::test]
    async fn test_improve_with_no_indices_skips_model() {
        let llm = MockProvider::new(REVIEW);
        let analyzer = analyzer(llm.clone());
        let report = analyzer
            .analyze_text(PROTOCOL.to_string(), "pcr.pdf", "s_pcr.pdf")
            .await
            .unwrap();
        llm.reset_call_count();

        let outcome = analyzer.improve(&report.analysis_id, &[]).await.unwrap();
        assert_eq!(
            outcome,
            ImproveOutcome::Unchanged {
                text: PROTOCOL.to_string()
            }
        );
        assert_eq!(outcome.suggestions_applied(), 0);
        assert_eq!(llm.call_count(), 0);

        // Only out-of-range indices behaves the same way
        let outcome = analyzer.improve(&report.analysis_id, &[3, 99, -1]).await.unwrap();
        assert_eq!(outcome.suggestions_applied(), 0);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_improve_applies_selected_suggestions() {
        let llm = MockProvider::default();
        llm.push_response(REVIEW);
        llm.push_response("PCR Amplification (v2)\n1. Wearing gloves, mix all reagents");
        let analyzer = analyzer(llm.clone());

        let report = analyzer
            .analyze_text(PROTOCOL.to_string(), "pcr.pdf", "s_pcr.pdf")
            .await
            .unwrap();

        // Index 0 is the HIGH suggestion after sorting; 7 is out of range
        let outcome = analyzer
            .improve(&report.analysis_id, &[0, 7, 2])
            .await
            .unwrap();

        match &outcome {
            ImproveOutcome::Revised {
                text,
                suggestions_applied,
                source_filename,
            } => {
                assert!(text.starts_with("PCR Amplification (v2)"));
                assert_eq!(*suggestions_applied, 2);
                assert_eq!(source_filename, "pcr.pdf");
            }
            other => panic!("expected Revised, got {:?}", other),
        }

        let request = llm.last_request().unwrap();
        let gloves = request.prompt.find("- Step 1: Wear gloves").unwrap();
        let version = request.prompt.find("- Title: Add a version number").unwrap();
        assert!(gloves < version);
        assert!(!request.prompt.contains("State cycling temperatures"));
        assert!(request.prompt.contains(PROTOCOL));
        assert_eq!(request.temperature, AnalyzerConfig::default().revision_temperature);
    }

    #[tokio::test]
    async fn test_improve_unknown_analysis() {
        let analyzer = analyzer(MockProvider::new(REVIEW));
        let result = analyzer.improve(&AnalysisId::from("nope"), &[0]).await;
        assert!(matches!(result, Err(AnalyzerError::AnalysisNotFound(_))));
    }

    #[tokio::test]
    async fn test_same_upload_twice_gets_distinct_ids() {
        let analyzer = analyzer(MockProvider::new(REVIEW));
        let first = analyzer
            .analyze_text(PROTOCOL.to_string(), "pcr.pdf", "s_pcr.pdf")
            .await
            .unwrap();
        let second = analyzer
            .analyze_text("Different text".to_string(), "pcr.pdf", "s_pcr.pdf")
            .await
            .unwrap();

        assert_ne!(first.analysis_id, second.analysis_id);
        let record = analyzer.store().get(&first.analysis_id).unwrap().unwrap();
        assert_eq!(record.original_text, PROTOCOL);
    }

    #[tokio::test]
    async fn test_analysis_id_uses_local_wall_clock() {
        // Upload names carry local time, so the id suffix must too
        let analyzer = analyzer(MockProvider::new(REVIEW));
        let before = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
        let report = analyzer
            .analyze_text(PROTOCOL.to_string(), "pcr.pdf", "s_pcr.pdf")
            .await
            .unwrap();
        let after = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();

        let suffix = report
            .analysis_id
            .as_str()
            .strip_prefix("s_pcr.pdf_")
            .unwrap();
        assert!(before.as_str() <= suffix && suffix <= after.as_str());

        let record = analyzer.store().get(&report.analysis_id).unwrap().unwrap();
        assert_eq!(record.created_at.format("%Y%m%d%H%M%S").to_string(), suffix);
    }

    #[tokio::test]
    async fn test_quick_check() {
        let llm = MockProvider::new("OK");
        let analyzer = analyzer(llm.clone());
        assert!(analyzer.quick_check().await);

        let request = llm.last_request().unwrap();
        assert_eq!(request.prompt, HEALTH_CHECK_PROMPT);
        assert_eq!(request.max_tokens, 50);

        llm.add_error(HEALTH_CHECK_PROMPT);
        assert!(!analyzer.quick_check().await);
    }
}
