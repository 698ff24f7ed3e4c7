//! Aggregate statistics over the stored analyses.
//!
//! The functions at the top are pure and take slices; `StatsRepository`
//! loads the collections and feeds them in.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;
use vigitva_common::risk::{
    average_score, percentage, round_half_up, round_one_decimal, LevelPercentages,
};
use vigitva_common::{
    Company, DocumentAnalysis, DocumentKind, InvoiceAnalysis, RiskDistribution, RiskLevel, Supplier,
};

use crate::analyses::AnalysisRepository;
use crate::companies::CompanyRepository;
use crate::database::Database;
use crate::documents::DocumentRepository;
use crate::error::Result;
use crate::suppliers::SupplierRepository;

/// Average above which an entity counts as high risk regardless of level.
const HIGH_RISK_AVERAGE: f64 = 7.0;
const HIGH_RISK_LIMIT: usize = 5;
const TOP_ENTITIES_PER_SIDE: usize = 3;
const RECENT_LIMIT: usize = 5;
/// Trend moves within this many percent are reported as stable.
const TREND_DEADBAND: f64 = 5.0;

const MONTHS_FR: [&str; 12] = [
    "janvier", "février", "mars", "avril", "mai", "juin",
    "juillet", "août", "septembre", "octobre", "novembre", "décembre",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysesByType {
    pub invoice: usize,
    pub fec: usize,
    pub tva: usize,
    pub journal: usize,
    pub bank: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedStats {
    pub total_analyses: usize,
    /// Rounded percent of analyses at level élevé.
    pub fraud_rate: u32,
    pub risk_distribution: RiskDistribution,
    pub by_type: AnalysesByType,
}

pub fn advanced_stats(invoices: &[InvoiceAnalysis], documents: &[DocumentAnalysis]) -> AdvancedStats {
    let mut by_type = AnalysesByType { invoice: invoices.len(), ..Default::default() };
    for doc in documents {
        match doc.kind {
            DocumentKind::Fec     => by_type.fec += 1,
            DocumentKind::Tva     => by_type.tva += 1,
            DocumentKind::Journal => by_type.journal += 1,
            DocumentKind::Bank    => by_type.bank += 1,
        }
    }

    let risk_distribution = RiskDistribution::from_levels(
        invoices
            .iter()
            .map(|a| a.risk_level)
            .chain(documents.iter().map(|d| d.risk_level)),
    );
    let total = risk_distribution.total();

    AdvancedStats {
        total_analyses: total,
        fraud_rate: percentage(risk_distribution.eleve, total),
        risk_distribution,
        by_type,
    }
}

/// Per-entity aggregate over invoice analyses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRiskStats {
    pub id: Uuid,
    pub name: String,
    pub analysis_count: usize,
    pub avg_risk_score: f64,
    pub risk_level: RiskLevel,
    pub last_analysis: Option<DateTime<Utc>>,
}

fn entity_stats<'a, I>(id: Uuid, name: &str, analyses: I) -> EntityRiskStats
where
    I: Iterator<Item = &'a InvoiceAnalysis>,
{
    let matching: Vec<&InvoiceAnalysis> = analyses.collect();
    let avg = average_score(matching.iter().map(|a| a.risk_score));
    EntityRiskStats {
        id,
        name: name.to_string(),
        analysis_count: matching.len(),
        avg_risk_score: round_one_decimal(avg),
        risk_level: RiskLevel::from_average(avg),
        // last in stored order, not the most recent timestamp
        last_analysis: matching.last().map(|a| a.created_at),
    }
}

pub fn company_risk_stats(companies: &[Company], analyses: &[InvoiceAnalysis]) -> Vec<EntityRiskStats> {
    companies
        .iter()
        .map(|c| entity_stats(c.id, &c.name, analyses.iter().filter(|a| a.company_id == c.id)))
        .collect()
}

pub fn supplier_risk_stats(suppliers: &[Supplier], analyses: &[InvoiceAnalysis]) -> Vec<EntityRiskStats> {
    suppliers
        .iter()
        .map(|s| entity_stats(s.id, &s.name, analyses.iter().filter(|a| a.supplier_id == s.id)))
        .collect()
}

fn sort_by_average_desc(items: &mut [EntityRiskStats]) {
    items.sort_by(|a, b| b.avg_risk_score.total_cmp(&a.avg_risk_score));
}

/// Entities at level élevé or averaging above 7, highest first, at most 5.
pub fn high_risk(stats: &[EntityRiskStats]) -> Vec<EntityRiskStats> {
    let mut flagged: Vec<EntityRiskStats> = stats
        .iter()
        .filter(|s| s.risk_level == RiskLevel::Eleve || s.avg_risk_score > HIGH_RISK_AVERAGE)
        .cloned()
        .collect();
    sort_by_average_desc(&mut flagged);
    flagged.truncate(HIGH_RISK_LIMIT);
    flagged
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskEvaluation {
    pub total_analyses: usize,
    pub avg_risk_score: f64,
    pub risk_distribution: RiskDistribution,
    pub percentages: LevelPercentages,
}

pub fn risk_evaluation(analyses: &[InvoiceAnalysis]) -> RiskEvaluation {
    let dist = RiskDistribution::from_levels(analyses.iter().map(|a| a.risk_level));
    RiskEvaluation {
        total_analyses: analyses.len(),
        avg_risk_score: round_one_decimal(average_score(analyses.iter().map(|a| a.risk_score))),
        percentages: dist.percentages(),
        risk_distribution: dist,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    /// `YYYY-MM`
    pub month: String,
    /// e.g. "mars 2024"
    pub month_name: String,
    pub total: usize,
    pub faible: usize,
    #[serde(rename = "modéré")]
    pub modere: usize,
    #[serde(rename = "élevé")]
    pub eleve: usize,
}

pub fn french_month_name(year: i32, month: u32) -> String {
    let idx = month.clamp(1, 12) as usize - 1;
    format!("{} {}", MONTHS_FR[idx], year)
}

/// Invoice analyses bucketed by UTC calendar month, oldest first.
pub fn monthly_trends(analyses: &[InvoiceAnalysis]) -> Vec<MonthlyTrend> {
    let mut buckets: BTreeMap<(i32, u32), RiskDistribution> = BTreeMap::new();
    for a in analyses {
        let key = (a.created_at.year(), a.created_at.month());
        buckets.entry(key).or_default().add(a.risk_level);
    }
    buckets
        .into_iter()
        .map(|((year, month), dist)| MonthlyTrend {
            month: format!("{:04}-{:02}", year, month),
            month_name: french_month_name(year, month),
            total: dist.total(),
            faible: dist.faible,
            modere: dist.modere,
            eleve: dist.eleve,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskTrend {
    pub direction: TrendDirection,
    /// Magnitude of the change, always non-negative.
    pub percentage: u32,
}

impl RiskTrend {
    pub const STABLE: RiskTrend = RiskTrend { direction: TrendDirection::Stable, percentage: 0 };
}

/// Compare high-risk counts of the last three months against the three before.
pub fn risk_trend(trends: &[MonthlyTrend]) -> RiskTrend {
    if trends.len() < 2 {
        return RiskTrend::STABLE;
    }
    let recent_start = trends.len().saturating_sub(3);
    let previous_start = trends.len().saturating_sub(6);

    let recent: usize = trends[recent_start..].iter().map(|t| t.eleve).sum();
    let previous: usize = trends[previous_start..recent_start].iter().map(|t| t.eleve).sum();
    if previous == 0 {
        return RiskTrend::STABLE;
    }

    let change = round_half_up((recent as f64 - previous as f64) / previous as f64 * 100.0);
    let direction = if change > TREND_DEADBAND {
        TrendDirection::Up
    } else if change < -TREND_DEADBAND {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    };
    RiskTrend { direction, percentage: change.abs() as u32 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Company,
    Supplier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntity {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(flatten)]
    pub stats: EntityRiskStats,
}

/// One line of the "recent analyses" feed, any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentAnalysis {
    pub id: Uuid,
    /// `invoice` or a document kind tag.
    #[serde(rename = "type")]
    pub kind: String,
    pub company_id: Uuid,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub stats: AdvancedStats,
    pub company_count: usize,
    pub supplier_count: usize,
    pub avg_company_risk: f64,
    pub avg_supplier_risk: f64,
    pub risk_percentages: LevelPercentages,
    pub top_entities: Vec<RankedEntity>,
    pub recent_analyses: Vec<RecentAnalysis>,
    pub trend: RiskTrend,
}

fn mean_of_averages(stats: &[EntityRiskStats]) -> f64 {
    if stats.is_empty() {
        return 0.0;
    }
    round_one_decimal(stats.iter().map(|s| s.avg_risk_score).sum::<f64>() / stats.len() as f64)
}

fn top_entities(companies: &[EntityRiskStats], suppliers: &[EntityRiskStats]) -> Vec<RankedEntity> {
    let mut top_suppliers = suppliers.to_vec();
    sort_by_average_desc(&mut top_suppliers);
    let mut top_companies = companies.to_vec();
    sort_by_average_desc(&mut top_companies);

    let mut ranked: Vec<RankedEntity> = top_suppliers
        .into_iter()
        .take(TOP_ENTITIES_PER_SIDE)
        .map(|stats| RankedEntity { entity_type: EntityType::Supplier, stats })
        .chain(
            top_companies
                .into_iter()
                .take(TOP_ENTITIES_PER_SIDE)
                .map(|stats| RankedEntity { entity_type: EntityType::Company, stats }),
        )
        .collect();
    ranked.sort_by(|a, b| b.stats.avg_risk_score.total_cmp(&a.stats.avg_risk_score));
    ranked
}

fn recent_analyses(invoices: &[InvoiceAnalysis], documents: &[DocumentAnalysis]) -> Vec<RecentAnalysis> {
    let mut all: Vec<RecentAnalysis> = invoices
        .iter()
        .map(|a| RecentAnalysis {
            id: a.id,
            kind: "invoice".to_string(),
            company_id: a.company_id,
            risk_score: a.risk_score,
            risk_level: a.risk_level,
            created_at: a.created_at,
        })
        .chain(documents.iter().map(|d| RecentAnalysis {
            id: d.id,
            kind: d.kind.as_str().to_string(),
            company_id: d.company_id,
            risk_score: d.risk_score,
            risk_level: d.risk_level,
            created_at: d.created_at,
        }))
        .collect();
    all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    all.truncate(RECENT_LIMIT);
    all
}

pub fn dashboard_summary(
    companies: &[Company],
    suppliers: &[Supplier],
    invoices: &[InvoiceAnalysis],
    documents: &[DocumentAnalysis],
) -> DashboardSummary {
    let stats = advanced_stats(invoices, documents);
    let company_stats = company_risk_stats(companies, invoices);
    let supplier_stats = supplier_risk_stats(suppliers, invoices);

    DashboardSummary {
        risk_percentages: stats.risk_distribution.percentages(),
        stats,
        company_count: companies.len(),
        supplier_count: suppliers.len(),
        avg_company_risk: mean_of_averages(&company_stats),
        avg_supplier_risk: mean_of_averages(&supplier_stats),
        top_entities: top_entities(&company_stats, &supplier_stats),
        recent_analyses: recent_analyses(invoices, documents),
        trend: risk_trend(&monthly_trends(invoices)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
    pub months: Vec<MonthlyTrend>,
    pub trend: RiskTrend,
    pub high_risk_companies: Vec<EntityRiskStats>,
    pub high_risk_suppliers: Vec<EntityRiskStats>,
}

/// Loads collections and computes the aggregates above.
#[derive(Clone)]
pub struct StatsRepository {
    companies: CompanyRepository,
    suppliers: SupplierRepository,
    analyses: AnalysisRepository,
    documents: DocumentRepository,
}

impl StatsRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            companies: CompanyRepository::new(db.clone()),
            suppliers: SupplierRepository::new(db.clone()),
            analyses: AnalysisRepository::new(db.clone()),
            documents: DocumentRepository::new(db),
        }
    }

    pub async fn advanced_stats(&self) -> Result<AdvancedStats> {
        let invoices = self.analyses.list().await?;
        let documents = self.documents.list_all().await?;
        Ok(advanced_stats(&invoices, &documents))
    }

    pub async fn company_risk_stats(&self) -> Result<Vec<EntityRiskStats>> {
        let companies = self.companies.list().await?;
        let analyses = self.analyses.list().await?;
        Ok(company_risk_stats(&companies, &analyses))
    }

    pub async fn supplier_risk_stats(&self) -> Result<Vec<EntityRiskStats>> {
        let suppliers = self.suppliers.list().await?;
        let analyses = self.analyses.list().await?;
        Ok(supplier_risk_stats(&suppliers, &analyses))
    }

    pub async fn risk_evaluation(&self) -> Result<RiskEvaluation> {
        Ok(risk_evaluation(&self.analyses.list().await?))
    }

    pub async fn trends(&self) -> Result<TrendReport> {
        let analyses = self.analyses.list().await?;
        let companies = self.companies.list().await?;
        let suppliers = self.suppliers.list().await?;
        let months = monthly_trends(&analyses);
        Ok(TrendReport {
            trend: risk_trend(&months),
            months,
            high_risk_companies: high_risk(&company_risk_stats(&companies, &analyses)),
            high_risk_suppliers: high_risk(&supplier_risk_stats(&suppliers, &analyses)),
        })
    }

    pub async fn dashboard_summary(&self) -> Result<DashboardSummary> {
        let companies = self.companies.list().await?;
        let suppliers = self.suppliers.list().await?;
        let invoices = self.analyses.list().await?;
        let documents = self.documents.list_all().await?;
        Ok(dashboard_summary(&companies, &suppliers, &invoices, &documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use vigitva_common::{AnalysisStatus, Criteria, Period};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn invoice(company_id: Uuid, supplier_id: Uuid, score: u8, created_at: DateTime<Utc>) -> InvoiceAnalysis {
        InvoiceAnalysis {
            id: Uuid::new_v4(),
            company_id,
            supplier_id,
            invoice_file: None,
            invoice_url: None,
            risk_score: score,
            risk_level: RiskLevel::from_score(score),
            criteria: Criteria::default(),
            recommendations: vec![],
            ai_message: None,
            confidence: 90,
            created_at,
        }
    }

    fn document(kind: DocumentKind, score: u8) -> DocumentAnalysis {
        DocumentAnalysis {
            id: Uuid::new_v4(),
            kind,
            company_id: Uuid::new_v4(),
            period: Period {
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            },
            file_name: "doc".into(),
            status: AnalysisStatus::Completed,
            risk_score: score,
            risk_level: RiskLevel::from_score(score),
            findings: vec![],
            ai_message: String::new(),
            confidence: 85,
            anomalies: vec![],
            created_at: at(2024, 4, 1),
        }
    }

    fn company(name: &str) -> Company {
        vigitva_common::NewCompany {
            name: name.into(),
            siret: "1".into(),
            ..Default::default()
        }
        .into_company(Uuid::new_v4(), Utc::now())
    }

    fn trend_with_high(counts: &[usize]) -> Vec<MonthlyTrend> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &eleve)| MonthlyTrend {
                month: format!("2024-{:02}", i + 1),
                month_name: String::new(),
                total: eleve,
                faible: 0,
                modere: 0,
                eleve,
            })
            .collect()
    }

    #[test]
    fn test_advanced_stats_empty_is_all_zero() {
        assert_eq!(advanced_stats(&[], &[]), AdvancedStats::default());
    }

    #[test]
    fn test_advanced_stats_counts_every_collection() {
        let (c, s) = (Uuid::new_v4(), Uuid::new_v4());
        let invoices = vec![invoice(c, s, 10, at(2024, 1, 5)), invoice(c, s, 2, at(2024, 1, 6))];
        let documents = vec![document(DocumentKind::Fec, 9), document(DocumentKind::Bank, 6)];
        let stats = advanced_stats(&invoices, &documents);

        assert_eq!(stats.total_analyses, 4);
        assert_eq!(stats.fraud_rate, 50);
        assert_eq!(stats.by_type, AnalysesByType { invoice: 2, fec: 1, tva: 0, journal: 0, bank: 1 });
        assert_eq!(stats.risk_distribution.modere, 1);
    }

    #[test]
    fn test_entity_stats_average_level_and_last() {
        let acme = company("Acme");
        let idle = company("Idle");
        let s = Uuid::new_v4();
        let analyses = vec![
            invoice(acme.id, s, 9, at(2024, 3, 1)),
            invoice(acme.id, s, 4, at(2024, 1, 1)),
            invoice(acme.id, s, 6, at(2024, 2, 1)),
        ];
        let stats = company_risk_stats(&[acme.clone(), idle], &analyses);

        assert_eq!(stats[0].analysis_count, 3);
        assert_eq!(stats[0].avg_risk_score, 6.3);
        assert_eq!(stats[0].risk_level, RiskLevel::Modere);
        assert_eq!(stats[0].last_analysis, Some(at(2024, 2, 1)));

        assert_eq!(stats[1].analysis_count, 0);
        assert_eq!(stats[1].avg_risk_score, 0.0);
        assert_eq!(stats[1].risk_level, RiskLevel::Faible);
        assert_eq!(stats[1].last_analysis, None);
    }

    #[test]
    fn test_high_risk_filters_sorts_and_caps() {
        let mut stats = Vec::new();
        for avg in [3.0, 7.5, 9.0, 7.0, 8.0, 10.0, 11.0, 7.2] {
            stats.push(EntityRiskStats {
                id: Uuid::new_v4(),
                name: format!("e{}", avg),
                analysis_count: 1,
                avg_risk_score: avg,
                risk_level: RiskLevel::from_average(avg),
                last_analysis: None,
            });
        }
        let flagged: Vec<f64> = high_risk(&stats).iter().map(|s| s.avg_risk_score).collect();
        assert_eq!(flagged, vec![11.0, 10.0, 9.0, 8.0, 7.5]);
    }

    #[test]
    fn test_monthly_trends_sorted_with_french_labels() {
        let (c, s) = (Uuid::new_v4(), Uuid::new_v4());
        let analyses = vec![
            invoice(c, s, 10, at(2024, 3, 10)),
            invoice(c, s, 1, at(2024, 1, 2)),
            invoice(c, s, 6, at(2024, 3, 20)),
        ];
        let trends = monthly_trends(&analyses);
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].month, "2024-01");
        assert_eq!(trends[0].month_name, "janvier 2024");
        assert_eq!(trends[1].month_name, "mars 2024");
        assert_eq!((trends[1].total, trends[1].modere, trends[1].eleve), (2, 1, 1));
    }

    #[test]
    fn test_risk_trend_needs_two_months_and_a_baseline() {
        assert_eq!(risk_trend(&trend_with_high(&[4])), RiskTrend::STABLE);
        // two months: both fall in the "recent" window, previous is empty
        assert_eq!(risk_trend(&trend_with_high(&[1, 3])), RiskTrend::STABLE);
    }

    #[test]
    fn test_risk_trend_direction_and_magnitude() {
        let up = risk_trend(&trend_with_high(&[1, 1, 2, 2, 2, 2]));
        assert_eq!(up, RiskTrend { direction: TrendDirection::Up, percentage: 50 });

        let down = risk_trend(&trend_with_high(&[2, 2, 2, 1, 1, 1]));
        assert_eq!(down, RiskTrend { direction: TrendDirection::Down, percentage: 50 });

        let flat = risk_trend(&trend_with_high(&[5, 5, 10, 5, 5, 10]));
        assert_eq!(flat, RiskTrend { direction: TrendDirection::Stable, percentage: 0 });
    }

    #[test]
    fn test_risk_trend_partial_previous_window() {
        // four months: previous window is just the first month
        let t = risk_trend(&trend_with_high(&[2, 1, 1, 1]));
        assert_eq!(t, RiskTrend { direction: TrendDirection::Up, percentage: 50 });
    }

    #[test]
    fn test_dashboard_summary_ranks_and_recent() {
        let a = company("A");
        let b = company("B");
        let s = Uuid::new_v4();
        let invoices = vec![
            invoice(a.id, s, 11, at(2024, 5, 1)),
            invoice(b.id, s, 2, at(2024, 5, 3)),
        ];
        let docs = vec![document(DocumentKind::Tva, 5)];
        let summary = dashboard_summary(&[a.clone(), b], &[], &invoices, &docs);

        assert_eq!(summary.avg_company_risk, 6.5);
        assert_eq!(summary.avg_supplier_risk, 0.0);
        assert_eq!(summary.top_entities[0].stats.id, a.id);
        assert_eq!(summary.recent_analyses.len(), 3);
        assert_eq!(summary.recent_analyses[0].kind, "invoice");
        assert_eq!(summary.recent_analyses[0].risk_score, 2);
        assert_eq!(summary.risk_percentages.eleve, 33);
    }

    #[tokio::test]
    async fn test_repository_on_empty_store() {
        let stats = StatsRepository::new(Arc::new(Database::in_memory()));
        assert_eq!(stats.advanced_stats().await.unwrap().total_analyses, 0);
        assert!(stats.company_risk_stats().await.unwrap().is_empty());
        let trends = stats.trends().await.unwrap();
        assert!(trends.months.is_empty());
        assert_eq!(trends.trend, RiskTrend::STABLE);
    }
}
