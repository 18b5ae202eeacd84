use crate::cli::AutomateArgs;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::output::OutputMode;
use crate::rules::{Automation, AutomationConfig, RunReport, schema};

pub async fn run(ctx: &AppContext, args: AutomateArgs) -> AppResult<()> {
    let rules = schema::load(&args.schema)?;
    let config = AutomationConfig {
        time_zone: ctx.config.time_zone,
    };
    let automation = Automation::new(config, ctx.mail_session().await?, ctx.open_store()?);
    let report = automation.run(&rules, args.force_retrieve).await?;

    if ctx.output.mode() == OutputMode::Text {
        for line in report_lines(&report) {
            println!("{line}");
        }
        return Ok(());
    }

    ctx.output.emit("", &report)
}

fn report_lines(report: &RunReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(report.outcomes.len() + 2);
    if let Some(fetched) = report.fetched {
        lines.push(format!("retrieved {fetched} emails"));
    }

    for outcome in &report.outcomes {
        lines.push(format!(
            "{}: {} matched, {} actions",
            outcome.name,
            outcome.matched.len(),
            outcome.actions
        ));
    }

    lines.push(format!(
        "{} rules over {} emails: {} matches, {} actions dispatched",
        report.rules, report.records, report.matches, report.actions
    ));
    lines
}
