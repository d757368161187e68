use anyhow::Result;
use serde::Serialize;

use crate::driver::{EpisodeSummary, RunReport};

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

/// Print `value` in a machine format, or run `human` for the human format.
pub fn emit<T, F>(value: &T, output: OutputFormat, human: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(),
{
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Human => human(),
    }
    Ok(())
}

pub fn episode_line(summary: &EpisodeSummary) -> String {
    format!(
        "episode={} reward={:.2} login={} contact={} steps={} elapsed={:.2}s",
        summary.episode,
        summary.total_reward,
        summary.login_success,
        summary.visited_contact,
        summary.steps,
        summary.time_elapsed
    )
}

pub fn report_lines(report: &RunReport) -> Vec<String> {
    let mut lines = vec![format!(
        "policy={} episodes={}{}",
        report.policy,
        report.episodes.len(),
        if report.interrupted { " (interrupted)" } else { "" }
    )];
    lines.push(format!(
        "success_rate={:.2} contact_rate={:.2} mean_reward={:.2} mean_steps={:.2}",
        report.success_rate, report.contact_rate, report.mean_reward, report.mean_steps
    ));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_lines_carry_key_fields() {
        let summary = EpisodeSummary {
            episode: 2,
            total_reward: 3.6,
            login_success: true,
            visited_contact: false,
            steps: 3,
            time_elapsed: 1.234,
        };
        assert_eq!(
            episode_line(&summary),
            "episode=2 reward=3.60 login=true contact=false steps=3 elapsed=1.23s"
        );
        let report = RunReport::new("scripted", vec![summary], true);
        let lines = report_lines(&report);
        assert_eq!(lines[0], "policy=scripted episodes=1 (interrupted)");
        assert!(lines[1].starts_with("success_rate=1.00"));
    }
}
