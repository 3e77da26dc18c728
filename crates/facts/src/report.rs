//! The annual report analysis.

use async_trait::async_trait;
use facts_core::{AggregateFn, FilterSpec, Result, ResultTable};
use facts_edgar::EdgarService;
use tracing::debug;

use crate::interface::Options;
use crate::registry::Analysis;

/// Tabulates the annually reported facts of the requested companies, one
/// row per company and fiscal year.
///
/// Facts reported several times within one fiscal year are averaged, and
/// facts missing from any row are dropped so every kept column covers the
/// whole window.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReportAnalysis;

#[async_trait]
impl Analysis for ReportAnalysis {
    fn name(&self) -> &'static str {
        "report"
    }

    fn description(&self) -> &'static str {
        "Annually reported facts, one row per company and fiscal year"
    }

    async fn analyze(&self, service: &EdgarService, options: &Options) -> Result<ResultTable> {
        let filter =
            FilterSpec::new(options.years(), options.last_report()?).with_annual_only(true);

        let mut table = service
            .table(options.tickers(), &filter, AggregateFn::Mean)
            .await?;
        table.normalize();
        debug!(
            "Report table covers {} rows and {} facts",
            table.len(),
            table.columns().len()
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AnalysisRegistry;
    use facts_core::{DataError, ReportPeriod, Ticker};
    use facts_edgar::Transport;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Arc;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const BASE: &str = "https://archives.test";
    const TICKERS: &str = "https://tickers.test/company_tickers.json";

    struct StaticTransport(HashMap<String, Vec<u8>>);

    #[async_trait]
    impl Transport for StaticTransport {
        async fn get(&self, url: &str) -> Result<Vec<u8>> {
            self.0
                .get(url)
                .cloned()
                .ok_or_else(|| DataError::Unavailable(url.to_string()))
        }
    }

    fn archive(sub_rows: &str, num_rows: &str) -> Vec<u8> {
        let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        writer.start_file("sub.txt", options).unwrap();
        write!(
            writer,
            "adsh\tcik\tname\tform\tperiod\tfy\tfp\tfiled\n{}",
            sub_rows
        )
        .unwrap();
        writer.start_file("num.txt", options).unwrap();
        write!(
            writer,
            "adsh\ttag\tversion\tddate\tqtrs\tuom\tvalue\n{}",
            num_rows
        )
        .unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn service_with(responses: HashMap<String, Vec<u8>>) -> EdgarService {
        EdgarService::new(Arc::new(StaticTransport(responses)))
            .with_archive_base_url(BASE)
            .with_tickers_url(TICKERS)
    }

    fn tickers_doc() -> Vec<u8> {
        br#"{"0":{"cik_str":320193,"ticker":"AAPL","title":"Apple Inc."}}"#.to_vec()
    }

    fn options() -> Options {
        Options::new("TestApp/1.0 (test@example.com)")
            .with_tickers(["aapl"])
            .with_years(1)
            .with_last_report(ReportPeriod::new(2023, 4).unwrap())
    }

    #[tokio::test]
    async fn test_report_tabulates_two_fiscal_years() {
        let recent = archive(
            "0000320193-23-000106\t320193\tApple Inc.\t10-K\t20230930\t2023\tFY\t20231103\n",
            "0000320193-23-000106\tAssets\tus-gaap/2023\t20230930\t0\tUSD\t90.0\n\
             0000320193-23-000106\tAssets\tus-gaap/2023\t20220924\t0\tUSD\t110.0\n\
             0000320193-23-000106\tGrossProfit\tus-gaap/2023\t20230930\t0\tUSD\t30.0\n",
        );
        let older = archive(
            "0000320193-22-000108\t320193\tApple Inc.\t10-K\t20220924\t2022\tFY\t20221028\n",
            "0000320193-22-000108\tAssets\tus-gaap/2022\t20220924\t0\tUSD\t50.0\n",
        );
        let service = service_with(HashMap::from([
            (TICKERS.to_string(), tickers_doc()),
            (format!("{}/2023q4.zip", BASE), recent),
            (format!("{}/2022q4.zip", BASE), older),
        ]));

        let analysis = AnalysisRegistry::with_builtins().create("report").unwrap();
        let table = analysis.analyze(&service, &options()).await.unwrap();

        let aapl = Ticker::new("AAPL");
        assert_eq!(table.rows(), [(aapl.clone(), 2022), (aapl.clone(), 2023)]);
        // GrossProfit is missing from fiscal 2022 and must not survive.
        assert_eq!(table.columns(), ["Assets"]);
        assert_eq!(table.get(&aapl, 2022, "Assets"), Some(50.0));
        assert_eq!(table.get(&aapl, 2023, "Assets"), Some(100.0));
    }

    #[tokio::test]
    async fn test_report_with_nothing_filed_is_no_data() {
        let service = service_with(HashMap::from([(TICKERS.to_string(), tickers_doc())]));

        let result = ReportAnalysis.analyze(&service, &options()).await;
        assert!(matches!(result, Err(DataError::NoData)));
    }
}
