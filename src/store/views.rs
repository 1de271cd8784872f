//! Read-only views derived from the store's collections.
//!
//! Everything here is a pure function of a snapshot; nothing is cached.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::Store;
use crate::models::{Lead, Settings, Task, TaskStatus, LOST_STAGE, NEW_STAGE, WON_STAGE};

const TRAILING_MONTHS: u32 = 6;

/// Leads in one pipeline stage.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineColumn {
    pub stage: String,
    pub leads: Vec<Lead>,
}

impl PipelineColumn {
    pub fn count(&self) -> usize {
        self.leads.len()
    }

    /// Sum of the column's deal values; leads without one count as zero.
    pub fn total_value(&self) -> f64 {
        self.leads.iter().filter_map(|l| l.deal_value).sum()
    }
}

/// Kanban-style grouping of leads by stage, in configured stage order.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineBoard {
    pub columns: Vec<PipelineColumn>,
    /// Leads whose status is not a configured stage.
    pub unstaged: Vec<Lead>,
}

impl PipelineBoard {
    pub fn build(leads: &[Lead], settings: &Settings) -> Self {
        let mut columns: Vec<PipelineColumn> = settings
            .pipeline_stages
            .iter()
            .map(|stage| PipelineColumn {
                stage: stage.clone(),
                leads: Vec::new(),
            })
            .collect();
        let mut unstaged = Vec::new();

        for lead in leads {
            match settings.stage_index(&lead.status) {
                Some(index) => columns[index].leads.push(lead.clone()),
                None => unstaged.push(lead.clone()),
            }
        }

        Self { columns, unstaged }
    }

    pub fn column(&self, stage: &str) -> Option<&PipelineColumn> {
        self.columns.iter().find(|c| c.stage == stage)
    }
}

/// A label with the number of leads carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardMetrics {
    pub new_leads: usize,
    pub won_deals: usize,
    pub revenue: f64,
    /// Percentage of all leads that are won; zero when there are no leads.
    pub conversion_rate: f64,
    /// Pending tasks assigned to the current user.
    pub my_pending_tasks: usize,
    pub leads_by_stage: Vec<LabelCount>,
    /// Descending by count, then by source name. Leads without a source count under `""`.
    pub leads_by_source: Vec<LabelCount>,
}

impl DashboardMetrics {
    pub fn compute(
        leads: &[Lead],
        tasks: &[Task],
        settings: &Settings,
        current_user_id: Option<&str>,
    ) -> Self {
        let won: Vec<&Lead> = leads.iter().filter(|l| l.status == WON_STAGE).collect();

        let my_pending_tasks = match current_user_id {
            Some(user_id) => tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Pending && t.assigned_to == user_id)
                .count(),
            None => 0,
        };

        let leads_by_stage = settings
            .pipeline_stages
            .iter()
            .map(|stage| LabelCount {
                label: stage.clone(),
                count: leads.iter().filter(|l| &l.status == stage).count(),
            })
            .collect();

        let mut by_source: HashMap<&str, usize> = HashMap::new();
        for lead in leads {
            *by_source.entry(lead.source.as_str()).or_default() += 1;
        }
        let mut leads_by_source: Vec<LabelCount> = by_source
            .into_iter()
            .map(|(label, count)| LabelCount {
                label: label.to_string(),
                count,
            })
            .collect();
        leads_by_source
            .sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));

        Self {
            new_leads: leads.iter().filter(|l| l.status == NEW_STAGE).count(),
            won_deals: won.len(),
            revenue: won.iter().filter_map(|l| l.deal_value).sum(),
            conversion_rate: percentage(won.len(), leads.len()),
            my_pending_tasks,
            leads_by_stage,
            leads_by_source,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FunnelStage {
    pub stage: String,
    /// Leads whose status is this stage or an earlier one, plus every won lead.
    pub count: usize,
    /// Share of the previous stage's count; `None` for the first stage or after an empty one.
    pub percent_of_previous: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    pub year: i32,
    pub month: u32,
    pub count: usize,
}

/// Aggregates for the reports page.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetrics {
    pub total_leads: usize,
    pub conversion_rate: f64,
    /// Total won value over the number of won deals; a won lead without a value counts as zero.
    pub average_deal_value: f64,
    pub funnel: Vec<FunnelStage>,
    /// Oldest month first, ending with the month containing `today`.
    pub monthly_leads: Vec<MonthlyCount>,
}

impl ReportMetrics {
    pub fn compute(leads: &[Lead], settings: &Settings, today: NaiveDate) -> Self {
        let won: Vec<&Lead> = leads.iter().filter(|l| l.status == WON_STAGE).collect();
        let won_value: f64 = won.iter().map(|l| l.deal_value.unwrap_or(0.0)).sum();
        let average_deal_value = if won.is_empty() {
            0.0
        } else {
            won_value / won.len() as f64
        };

        Self {
            total_leads: leads.len(),
            conversion_rate: percentage(won.len(), leads.len()),
            average_deal_value,
            funnel: funnel(leads, settings),
            monthly_leads: monthly_counts(leads, today),
        }
    }
}

fn funnel(leads: &[Lead], settings: &Settings) -> Vec<FunnelStage> {
    let stages: Vec<&String> = settings
        .pipeline_stages
        .iter()
        .filter(|s| s.as_str() != LOST_STAGE)
        .collect();

    let mut previous: Option<usize> = None;
    stages
        .iter()
        .enumerate()
        .map(|(index, stage)| {
            let upto = &stages[..=index];
            let count = leads
                .iter()
                .filter(|l| l.status == WON_STAGE || upto.iter().any(|s| **s == l.status))
                .count();
            let step = FunnelStage {
                stage: (*stage).clone(),
                count,
                percent_of_previous: previous
                    .filter(|&p| p > 0)
                    .map(|p| percentage(count, p)),
            };
            previous = Some(count);
            step
        })
        .collect()
}

fn monthly_counts(leads: &[Lead], today: NaiveDate) -> Vec<MonthlyCount> {
    let mut months: Vec<MonthlyCount> = (0..TRAILING_MONTHS)
        .rev()
        .map(|back| {
            let (year, month) = months_before(today.year(), today.month(), back);
            MonthlyCount {
                year,
                month,
                count: 0,
            }
        })
        .collect();

    for lead in leads {
        let created = lead.created_at.date_naive();
        if let Some(slot) = months
            .iter_mut()
            .find(|m| m.year == created.year() && m.month == created.month())
        {
            slot.count += 1;
        }
    }
    months
}

fn months_before(year: i32, month: u32, back: u32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 - back as i32;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Tasks of one month keyed by due date.
#[derive(Debug, Clone, Serialize)]
pub struct TaskCalendar {
    pub year: i32,
    pub month: u32,
    pub days: BTreeMap<NaiveDate, Vec<Task>>,
}

impl TaskCalendar {
    pub fn for_month(tasks: &[Task], year: i32, month: u32) -> Self {
        let mut days: BTreeMap<NaiveDate, Vec<Task>> = BTreeMap::new();
        for task in tasks
            .iter()
            .filter(|t| t.due_date.year() == year && t.due_date.month() == month)
        {
            days.entry(task.due_date).or_default().push(task.clone());
        }
        Self { year, month, days }
    }

    pub fn on(&self, day: NaiveDate) -> &[Task] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Store {
    pub fn pipeline_board(&self) -> PipelineBoard {
        let state = self.state();
        PipelineBoard::build(&state.leads, &state.settings)
    }

    pub fn dashboard(&self) -> DashboardMetrics {
        let state = self.state();
        let user_id = state.identity.as_ref().map(|i| i.user_id.as_str());
        DashboardMetrics::compute(&state.leads, &state.tasks, &state.settings, user_id)
    }

    pub fn report(&self, today: NaiveDate) -> ReportMetrics {
        let state = self.state();
        ReportMetrics::compute(&state.leads, &state.settings, today)
    }

    pub fn task_calendar(&self, year: i32, month: u32) -> TaskCalendar {
        TaskCalendar::for_month(&self.state().tasks, year, month)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::TaskPriority;

    fn lead(id: &str, status: &str, source: &str, value: Option<f64>) -> Lead {
        let created = Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();
        Lead {
            id: id.to_string(),
            name: format!("Lead {}", id),
            email: format!("{}@example.com", id),
            phone: String::new(),
            source: source.to_string(),
            status: status.to_string(),
            assigned_to: "u1".to_string(),
            purpose: String::new(),
            notes: String::new(),
            deal_value: value,
            created_at: created,
            last_contacted: created,
        }
    }

    fn task(id: &str, due: NaiveDate, status: TaskStatus, assigned_to: &str) -> Task {
        Task {
            id: id.to_string(),
            title: format!("Task {}", id),
            lead_id: "l1".to_string(),
            assigned_to: assigned_to.to_string(),
            due_date: due,
            priority: TaskPriority::Medium,
            status,
            created_at: Utc::now(),
        }
    }

    fn sample_leads() -> Vec<Lead> {
        vec![
            lead("l1", "New", "Website", None),
            lead("l2", "Proposal", "Referral", Some(500.0)),
            lead("l3", "Won", "Website", Some(1000.0)),
            lead("l4", "Won", "Partner", Some(3000.0)),
            lead("l5", "Lost", "Website", Some(200.0)),
            lead("l6", "Archived", "Referral", None),
        ]
    }

    #[test]
    fn board_groups_by_stage_and_keeps_unknown_statuses_apart() {
        let board = PipelineBoard::build(&sample_leads(), &Settings::default());

        assert_eq!(board.columns.len(), 6);
        assert_eq!(board.columns[0].stage, "New");
        let won = board.column("Won").unwrap();
        assert_eq!(won.count(), 2);
        assert_eq!(won.total_value(), 4000.0);
        assert_eq!(board.unstaged.len(), 1);
        assert_eq!(board.unstaged[0].id, "l6");
    }

    #[test]
    fn dashboard_counts() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let tasks = vec![
            task("t1", day, TaskStatus::Pending, "u1"),
            task("t2", day, TaskStatus::Completed, "u1"),
            task("t3", day, TaskStatus::Pending, "u2"),
        ];
        let metrics =
            DashboardMetrics::compute(&sample_leads(), &tasks, &Settings::default(), Some("u1"));

        assert_eq!(metrics.new_leads, 1);
        assert_eq!(metrics.won_deals, 2);
        assert_eq!(metrics.revenue, 4000.0);
        assert!((metrics.conversion_rate - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(metrics.my_pending_tasks, 1);
        assert_eq!(
            metrics.leads_by_source[0],
            LabelCount {
                label: "Website".to_string(),
                count: 3
            }
        );
        assert_eq!(metrics.leads_by_source[1].label, "Referral");
    }

    #[test]
    fn leads_without_a_source_are_counted_under_blank() {
        let leads = vec![
            lead("l1", "New", "", None),
            lead("l2", "New", "", None),
            lead("l3", "New", "Website", None),
        ];
        let metrics = DashboardMetrics::compute(&leads, &[], &Settings::default(), None);

        assert_eq!(
            metrics.leads_by_source,
            vec![
                LabelCount {
                    label: String::new(),
                    count: 2
                },
                LabelCount {
                    label: "Website".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn dashboard_on_empty_store() {
        let metrics = DashboardMetrics::compute(&[], &[], &Settings::default(), None);
        assert_eq!(metrics.conversion_rate, 0.0);
        assert_eq!(metrics.my_pending_tasks, 0);
        assert!(metrics.leads_by_source.is_empty());
    }

    #[test]
    fn funnel_counts_earlier_stages_plus_won() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let report = ReportMetrics::compute(&sample_leads(), &Settings::default(), today);

        let stages: Vec<(&str, usize)> = report
            .funnel
            .iter()
            .map(|f| (f.stage.as_str(), f.count))
            .collect();
        assert_eq!(
            stages,
            vec![
                ("New", 3),
                ("Contacted", 3),
                ("Proposal", 4),
                ("Negotiation", 4),
                ("Won", 4)
            ]
        );
        assert_eq!(report.funnel[0].percent_of_previous, None);
        assert_eq!(report.funnel[1].percent_of_previous, Some(100.0));
        assert_eq!(report.funnel[3].percent_of_previous, Some(100.0));
        assert_eq!(report.average_deal_value, 2000.0);
    }

    #[test]
    fn lost_leads_stay_out_of_the_funnel_and_valueless_wins_lower_the_average() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let leads = vec![
            lead("l1", "New", "Website", None),
            lead("l2", "Won", "Website", Some(1000.0)),
            lead("l3", "Won", "Website", None),
            lead("l4", "Lost", "Website", Some(5.0)),
        ];

        let report = ReportMetrics::compute(&leads, &Settings::default(), today);

        let counts: Vec<usize> = report.funnel.iter().map(|f| f.count).collect();
        assert_eq!(counts, vec![3, 3, 3, 3, 3]);
        assert_eq!(report.average_deal_value, 500.0);
        assert_eq!(report.conversion_rate, 50.0);
    }

    #[test]
    fn funnel_after_an_empty_stage_has_no_percentage() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let report = ReportMetrics::compute(&[], &Settings::default(), today);

        assert!(report.funnel.iter().all(|f| f.count == 0));
        assert!(report.funnel.iter().all(|f| f.percent_of_previous.is_none()));
        assert_eq!(report.average_deal_value, 0.0);
    }

    #[test]
    fn monthly_counts_cover_trailing_half_year() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let report = ReportMetrics::compute(&sample_leads(), &Settings::default(), today);
        let labels: Vec<(i32, u32)> = report
            .monthly_leads
            .iter()
            .map(|m| (m.year, m.month))
            .collect();
        assert_eq!(
            labels,
            vec![(2023, 9), (2023, 10), (2023, 11), (2023, 12), (2024, 1), (2024, 2)]
        );
        assert!(report.monthly_leads.iter().all(|m| m.count == 0));

        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let report = ReportMetrics::compute(&sample_leads(), &Settings::default(), today);
        assert_eq!(report.monthly_leads[4].month, 5);
        assert_eq!(report.monthly_leads[4].count, 6);
    }

    #[test]
    fn calendar_keeps_only_the_requested_month() {
        let june = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let july = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let tasks = vec![
            task("t1", june, TaskStatus::Pending, "u1"),
            task("t2", june, TaskStatus::Completed, "u2"),
            task("t3", july, TaskStatus::Pending, "u1"),
        ];

        let calendar = TaskCalendar::for_month(&tasks, 2024, 6);
        assert_eq!(calendar.days.len(), 1);
        assert_eq!(calendar.on(june).len(), 2);
        assert!(calendar.on(july).is_empty());
    }
}
