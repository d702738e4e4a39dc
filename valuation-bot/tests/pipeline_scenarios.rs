//! End-to-end report runs against mock provider and webhook servers.
//!
//! Each test wires a real pipeline from configuration, points it at
//! wiremock servers, and checks both the run outcome and what (if anything)
//! reached the webhook.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use valuation_bot::cli::run_report;
use valuation_bot::data::{MetricRequest, MetricsSource, ProviderError, RawDataset};
use valuation_bot::{ReportKind, ReportPipeline, ReportProfile, ValuationReport};
use valuation_common::config::AppConfig;

// ============================================================================
// Helpers
// ============================================================================

fn report_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 20).unwrap()
}

fn valuation_section(provider: &MockServer, webhook: &MockServer, codes: &[&str]) -> Value {
    json!({
        "lixinger": {
            "token": "test-token",
            "api_url": format!("{}/api/hk/index/fundamental", provider.uri())
        },
        "dingtalk": {
            "webhook_url": format!("{}/robot/send", webhook.uri())
        },
        "stock_codes": codes,
        "index_names": { "HSI": "恒生指数", "HSCEI": "国企指数" }
    })
}

fn config(value: Value) -> AppConfig {
    serde_json::from_value(value).unwrap()
}

async fn webhook_replying(errcode: i64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/robot/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "errcode": errcode, "errmsg": "" })))
        .mount(&server)
        .await;
    server
}

/// Markdown text of the single message the webhook received.
async fn delivered_text(webhook: &MockServer) -> String {
    let requests: Vec<Request> = webhook.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1, "expected exactly one webhook call");
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["msgtype"], "markdown");
    body["markdown"]["text"].as_str().unwrap().to_string()
}

// ============================================================================
// Index report
// ============================================================================

#[tokio::test]
async fn test_index_report_happy_path() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/hk/index/fundamental"))
        .and(body_partial_json(json!({
            "token": "test-token",
            "date": "2024-12-20",
            "stockCodes": ["HSI", "HSCEI"],
            "metricsList": ["pe_ttm.y10.mcw.cvpos"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 1,
            "data": [
                { "stockCode": "HSI", "pe_ttm.y10.mcw.cvpos": 0.15 },
                { "stockCode": "HSCEI", "pe_ttm.y10.mcw.cvpos": null }
            ]
        })))
        .expect(1)
        .mount(&provider)
        .await;
    let webhook = webhook_replying(0).await;

    let config = config(json!({ "hk_config": valuation_section(&provider, &webhook, &["HSI", "HSCEI"]) }));
    let delivered = run_report(ReportKind::HkIndex, &config, Some(report_date())).await.unwrap();
    assert!(delivered);

    let text = delivered_text(&webhook).await;
    assert!(text.starts_with("🇭🇰 **港股指数估值播报**\n\n📅 **日期**: 2024-12-20\n\n\n\n"));
    assert!(text.contains("📈 **恒生指数** | 估值: **15.0%** | 🟢 低估\n\n"));
    assert!(text.contains("📈 **国企指数** | 状态: ❌ 数据获取失败\n\n"));
    assert!(text.ends_with("🔴 **80-100%**: 高估区域"));

    let requests = webhook.received_requests().await.unwrap_or_default();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["markdown"]["title"], "港股指数估值播报");
}

#[tokio::test]
async fn test_broken_indicator_section_does_not_block_index_report() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "stockCode": "HSI", "pe_ttm.y10.mcw.cvpos": 0.5 }]
        })))
        .expect(1)
        .mount(&provider)
        .await;
    let webhook = webhook_replying(0).await;

    let mut section = valuation_section(&provider, &webhook, &["HSI"]);
    section["stock_names"] = json!({ "HSI": "不应使用" });

    let config = config(json!({
        "hk_config": section,
        "cn_config": { "indicators": [{ "key": "ebs" }] }
    }));

    assert!(run_report(ReportKind::HkIndex, &config, Some(report_date())).await.unwrap());
    assert!(delivered_text(&webhook).await.contains("📈 **恒生指数** | 估值: **50.0%** | 🟠 适中"));

    let err = run_report(ReportKind::Indicator, &config, None).await.unwrap_err();
    assert!(format!("{err:#}").contains("cn_config"));
}

#[tokio::test]
async fn test_provider_error_sends_nothing() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&provider)
        .await;

    let webhook = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "errcode": 0 })))
        .expect(0)
        .mount(&webhook)
        .await;

    let config = config(json!({ "hk_config": valuation_section(&provider, &webhook, &["HSI"]) }));
    let delivered = run_report(ReportKind::HkIndex, &config, Some(report_date())).await.unwrap();
    assert!(!delivered);
}

#[tokio::test]
async fn test_empty_provider_data_sends_nothing() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 1, "data": [] })))
        .mount(&provider)
        .await;

    let webhook = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "errcode": 0 })))
        .expect(0)
        .mount(&webhook)
        .await;

    let config = config(json!({ "hk_config": valuation_section(&provider, &webhook, &["HSI"]) }));
    assert!(!run_report(ReportKind::HkIndex, &config, Some(report_date())).await.unwrap());
}

#[tokio::test]
async fn test_webhook_rejection_is_failure() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "stockCode": "HSI", "pe_ttm.y10.mcw.cvpos": 0.5 }]
        })))
        .mount(&provider)
        .await;
    let webhook = webhook_replying(1).await;

    let config = config(json!({ "hk_config": valuation_section(&provider, &webhook, &["HSI"]) }));
    let delivered = run_report(ReportKind::HkIndex, &config, Some(report_date())).await.unwrap();

    assert!(!delivered);
    assert_eq!(webhook.received_requests().await.unwrap_or_default().len(), 1);
}

// ============================================================================
// Stock report
// ============================================================================

#[tokio::test]
async fn test_stock_report_uses_hard_line_breaks() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "metricsList": ["pe_ttm", "pe_ttm.y3.cvpos", "pe_ttm.y5.cvpos", "pe_ttm.y10.cvpos"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "stockCode": "600519",
                "pe_ttm": 25.0,
                "pe_ttm.y3.cvpos": 0.9,
                "pe_ttm.y5.cvpos": 0.5,
                "pe_ttm.y10.cvpos": 0.1
            }]
        })))
        .expect(1)
        .mount(&provider)
        .await;
    let webhook = webhook_replying(0).await;

    let mut section = valuation_section(&provider, &webhook, &["600519"]);
    section["stock_names"] = json!({ "600519": "贵州茅台" });
    section.as_object_mut().unwrap().remove("index_names");

    let config = config(json!({ "stock_config": section }));
    assert!(run_report(ReportKind::Stock, &config, Some(report_date())).await.unwrap());

    let text = delivered_text(&webhook).await;
    let lines: Vec<&str> = text.split('\n').collect();
    assert_eq!(lines[0], "📊 **股票估值播报**");
    assert_eq!(
        lines[3],
        "📈 **贵州茅台(600519)** | PE: **25.00** | 百分位: 3年: 90.0% | 5年: 50.0% | 10年: 10.0% | 🟢 低估  "
    );
}

// ============================================================================
// Macro indicator report
// ============================================================================

#[tokio::test]
async fn test_indicator_report_partial_failure_still_sends() {
    let series = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ebs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "date": "2024-12-19", "股债利差": 4.0 },
            { "date": "2024-12-20", "股债利差": 4.1 }
        ])))
        .mount(&series)
        .await;
    Mock::given(method("GET"))
        .and(path("/buffett"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&series)
        .await;
    let webhook = webhook_replying(0).await;

    let config = config(json!({
        "cn_config": {
            "dingtalk": { "webhook_url": format!("{}/robot/send", webhook.uri()) },
            "indicators": [
                { "key": "ebs", "name": "股债利差", "url": format!("{}/ebs", series.uri()) },
                { "key": "buffett", "name": "巴菲特指标", "emoji": "💰", "url": format!("{}/buffett", series.uri()) }
            ]
        }
    }));

    assert!(run_report(ReportKind::Indicator, &config, Some(report_date())).await.unwrap());

    let text = delivered_text(&webhook).await;
    assert!(text.starts_with("📊 **股票指标数据播报**\n\n📅 **日期**: 2024-12-20"));
    assert!(text.contains("📈 **股债利差**\n\n📅 日期: 2024-12-20\n\n📊 股债利差: 4.1"));
    assert!(text.contains("💰 **巴菲特指标**\n\n❌ 获取失败: HTTP 404"));
    assert!(text.ends_with("📈 市盈率分位数：当前估值在历史数据中的相对位置"));
}

#[tokio::test]
async fn test_indicator_report_all_failed_sends_nothing() {
    let series = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&series)
        .await;

    let webhook = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "errcode": 0 })))
        .expect(0)
        .mount(&webhook)
        .await;

    let config = config(json!({
        "cn_config": {
            "dingtalk": { "webhook_url": format!("{}/robot/send", webhook.uri()) },
            "indicators": [{ "key": "ebs", "name": "股债利差", "url": format!("{}/ebs", series.uri()) }]
        }
    }));

    assert!(!run_report(ReportKind::Indicator, &config, None).await.unwrap());
}

// ============================================================================
// Custom metrics source
// ============================================================================

/// Source that counts calls and always fails.
struct FailingSource {
    calls: AtomicU32,
}

#[async_trait]
impl MetricsSource for FailingSource {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn fetch(&self, _request: &MetricRequest) -> Result<RawDataset, ProviderError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(ProviderError::Network("Connection failed".into()))
    }
}

#[tokio::test]
async fn test_pipeline_with_custom_source() {
    let webhook = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "errcode": 0 })))
        .expect(0)
        .mount(&webhook)
        .await;

    let provider = MockServer::start().await;
    let config = config(json!({ "hk_config": valuation_section(&provider, &webhook, &["HSI"]) }));
    let section = config.valuation_section("hk_config").unwrap();

    let source = Arc::new(FailingSource {
        calls: AtomicU32::new(0),
    });
    let notifier = Arc::new(valuation_bot::DingTalkNotifier::new(
        section.dingtalk.webhook_url.clone(),
        "港股指数估值播报",
    ));
    let pipeline = ReportPipeline::new(
        ValuationReport::new(ReportProfile::hk_index(), source.clone(), &section),
        notifier,
    );

    assert!(!pipeline.run(Some(report_date())).await);
    assert_eq!(source.calls.load(Ordering::Relaxed), 1);
}
