//! Chat pipeline tests with mocked model and store seams

mod common;

use std::sync::Arc;

use admissions_explorer::chat::ChatPipeline;
use admissions_explorer::db::{AdmissionsStore, Dialect};
use admissions_explorer::error::{ExplorerError, Result};
use admissions_explorer::llm::TextGenerator;
use admissions_explorer::models::{SqlValue, Table};
use async_trait::async_trait;
use mockall::{mock, Sequence};

mock! {
    pub Generator {}

    #[async_trait]
    impl TextGenerator for Generator {
        async fn generate(&self, prompt: &str) -> Result<String>;
    }
}

mock! {
    pub Store {}

    impl AdmissionsStore for Store {
        fn dialect(&self) -> Dialect;
        fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Table>;
        fn count(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;
    }
}

const FENCED_SQL: &str = "```sql\nSELECT SEXO, COUNT(*) AS TOTAL\nFROM VISTAMUYINTERESANTE\nGROUP BY SEXO\nORDER BY SEXO;\n```";
const CLEAN_SQL: &str = "SELECT SEXO, COUNT(*) AS TOTAL FROM VISTAMUYINTERESANTE GROUP BY SEXO ORDER BY SEXO";

fn pipeline(store: Arc<dyn AdmissionsStore>, generator: Option<MockGenerator>) -> ChatPipeline {
    let generator = generator.map(|g| Arc::new(g) as Arc<dyn TextGenerator>);
    ChatPipeline::new(store, generator, "ADMIN", 100).unwrap()
}

#[tokio::test]
async fn answers_with_sanitized_sql_and_model_text() {
    let store: Arc<dyn AdmissionsStore> = Arc::new(common::seeded_memory_store());
    let mut generator = MockGenerator::new();
    let mut seq = Sequence::new();

    generator
        .expect_generate()
        .withf(|prompt: &str| prompt.contains("VISTAMUYINTERESANTE(") && prompt.contains("¿Cuántos ingresos por sexo?"))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(FENCED_SQL.to_string()));
    generator
        .expect_generate()
        .withf(|prompt: &str| prompt.contains("Hombre | 13") && prompt.contains("Mujer | 12") && prompt.contains(CLEAN_SQL))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok("Hay 13 ingresos de hombres y 12 de mujeres.".to_string()));

    let exchange = pipeline(store, Some(generator))
        .ask("¿Cuántos ingresos por sexo?")
        .await
        .unwrap();

    assert_eq!(exchange.generated_sql, CLEAN_SQL);
    assert_eq!(exchange.answer, "Hay 13 ingresos de hombres y 12 de mujeres.");
    assert_eq!(exchange.result.len(), 2);
}

#[tokio::test]
async fn prompts_carry_the_question_as_asked() {
    const QUESTION: &str = "  ¿Cuántos ingresos\thay en Galicia?\n";
    let store: Arc<dyn AdmissionsStore> = Arc::new(common::seeded_memory_store());
    let mut generator = MockGenerator::new();
    let mut seq = Sequence::new();

    generator
        .expect_generate()
        .withf(|prompt: &str| prompt.ends_with(&format!("Pregunta: {QUESTION}")))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok("SELECT COUNT(*) AS TOTAL FROM VISTAMUYINTERESANTE WHERE COMUNIDAD_ATENCION = 'Galicia'".to_string()));
    generator
        .expect_generate()
        .withf(|prompt: &str| prompt.contains(QUESTION))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok("Hay 9 ingresos en Galicia.".to_string()));

    let exchange = pipeline(store, Some(generator)).ask(QUESTION).await.unwrap();
    assert_eq!(exchange.question, QUESTION);
}

#[tokio::test]
async fn unconfigured_model_never_touches_the_store() {
    let mut store = MockStore::new();
    store.expect_dialect().times(0);
    store.expect_query().times(0);
    store.expect_count().times(0);

    let err = pipeline(Arc::new(store), None).ask("¿Cuántos ingresos hay?").await.unwrap_err();
    assert!(matches!(err, ExplorerError::ServiceUnconfigured));
}

#[tokio::test]
async fn empty_question_is_a_validation_error() {
    let mut store = MockStore::new();
    store.expect_query().times(0);
    let mut generator = MockGenerator::new();
    generator.expect_generate().times(0);

    let err = pipeline(Arc::new(store), Some(generator)).ask("   ").await.unwrap_err();
    assert!(matches!(err, ExplorerError::Validation(_)));
}

#[tokio::test]
async fn schema_failure_stops_before_generation() {
    let mut store = MockStore::new();
    store.expect_dialect().return_const(Dialect::Oracle);
    store
        .expect_query()
        .withf(|sql: &str, params: &[SqlValue]| {
            sql.contains("ALL_TAB_COLUMNS") && params == [SqlValue::Text("ADMIN".into())]
        })
        .times(1)
        .returning(|_, _| Err(ExplorerError::BackendUnavailable("ORA-12541: TNS:no listener".into())));
    let mut generator = MockGenerator::new();
    generator.expect_generate().times(0);

    let err = pipeline(Arc::new(store), Some(generator)).ask("¿Cuántos?").await.unwrap_err();
    assert!(matches!(err, ExplorerError::SchemaUnavailable(ref msg) if msg.contains("ORA-12541")));
}

#[tokio::test]
async fn rejected_statement_is_not_executed() {
    let mut store = MockStore::new();
    store.expect_dialect().return_const(Dialect::Sqlite);
    store
        .expect_query()
        .withf(|sql: &str, _params: &[SqlValue]| sql.contains("sqlite_master"))
        .times(1)
        .returning(|_, _| Ok(Table::default()));
    let mut generator = MockGenerator::new();
    generator
        .expect_generate()
        .times(1)
        .returning(|_| Ok("```sql\nDELETE FROM INGRESOS;\n```".to_string()));

    let err = pipeline(Arc::new(store), Some(generator))
        .ask("Borra todo")
        .await
        .unwrap_err();
    assert!(matches!(err, ExplorerError::RejectedStatement(_)));
}

#[tokio::test]
async fn backend_error_is_surfaced_and_explanation_skipped() {
    let store: Arc<dyn AdmissionsStore> = Arc::new(common::seeded_memory_store());
    let mut generator = MockGenerator::new();
    generator
        .expect_generate()
        .times(1)
        .returning(|_| Ok("SELECT * FROM TABLA_INEXISTENTE".to_string()));

    let err = pipeline(store, Some(generator)).ask("¿Qué hay?").await.unwrap_err();
    match err {
        ExplorerError::BackendUnavailable(message) => assert!(message.contains("TABLA_INEXISTENTE")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn generation_failure_is_not_retried() {
    let store: Arc<dyn AdmissionsStore> = Arc::new(common::seeded_memory_store());
    let mut generator = MockGenerator::new();
    generator
        .expect_generate()
        .times(1)
        .returning(|_| Err(ExplorerError::Generation("HTTP 500".into())));

    let err = pipeline(store, Some(generator)).ask("¿Qué hay?").await.unwrap_err();
    assert!(matches!(err, ExplorerError::Generation(_)));
}

#[tokio::test]
async fn large_results_are_capped_in_the_prompt() {
    let store: Arc<dyn AdmissionsStore> = Arc::new(common::seeded_memory_store());
    let mut generator = MockGenerator::new();
    let mut seq = Sequence::new();
    generator
        .expect_generate()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok("SELECT ID FROM INGRESOS".to_string()));
    generator
        .expect_generate()
        .withf(|prompt: &str| prompt.contains("(20 filas más omitidas)"))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok("25 ingresos.".to_string()));

    let store_pipeline = ChatPipeline::new(
        store,
        Some(Arc::new(generator) as Arc<dyn TextGenerator>),
        "ADMIN",
        5,
    )
    .unwrap();
    let exchange = store_pipeline.ask("Lista los ingresos").await.unwrap();
    assert_eq!(exchange.result.len(), 25);
}
