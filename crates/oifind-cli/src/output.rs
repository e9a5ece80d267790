//! Rendering of query reports for the terminal.

use std::fmt::Write as _;

use clap::ValueEnum;
use oifind_core::{
  finder::Report,
  model::{Gender, Identity},
  tracker::Step,
};
use oifind_remote::Usage;
use serde_json::json;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Table,
  Json,
}

pub fn render(report: &Report, usage: Option<Usage>, format: OutputFormat) -> String {
  match format {
    OutputFormat::Table => table(report, usage),
    OutputFormat::Json => {
      let body = json!({
        "data": report.identities,
        "steps": report.steps,
        "usage": usage,
      });
      // Serialising plain data into a `String` cannot fail.
      serde_json::to_string_pretty(&body).unwrap_or_default()
    }
  }
}

fn gender(g: Gender) -> &'static str {
  match g {
    Gender::Male => "M",
    Gender::Female => "F",
    Gender::Unknown => "-",
  }
}

fn opt<T: ToString>(v: Option<T>) -> String { v.map_or_else(|| "-".to_owned(), |v| v.to_string()) }

fn row(out: &mut String, i: &Identity) {
  let _ = writeln!(
    out,
    "{:>8}  {:<12} {:>6}  {:^3}  {:>8}  {:>5}",
    i.uid,
    i.name,
    opt(i.enroll_middle),
    gender(i.gender),
    i.oierdb_score.map_or_else(|| "-".to_owned(), |s| format!("{s:.2}")),
    opt(i.ccf_level),
  );
}

fn table(report: &Report, usage: Option<Usage>) -> String {
  let mut out = String::new();
  let _ = writeln!(
    out,
    "{:>8}  {:<12} {:>6}  {:^3}  {:>8}  {:>5}",
    "uid", "name", "enroll", "sex", "score", "ccf"
  );
  for identity in &report.identities {
    row(&mut out, identity);
  }

  let _ = writeln!(out);
  for step in &report.steps {
    let _ = match step {
      Step::Bootstrap { calls, rows, candidates } => writeln!(
        out,
        "bootstrap       calls={calls} rows={rows} candidates={candidates}"
      ),
      Step::Group { index, strategy, calls, rows, candidates } => {
        let strategy = format!("{strategy:?}");
        writeln!(
          out,
          "group {index:<3} {strategy:<10} calls={calls} rows={rows} candidates={candidates}"
        )
      }
      Step::Fetch { calls, rows } => writeln!(out, "fetch           calls={calls} rows={rows}"),
    };
  }
  let _ = writeln!(
    out,
    "{} result(s), {} backend call(s)",
    report.identities.len(),
    report.calls()
  );
  if let Some(u) = usage {
    let _ = writeln!(
      out,
      "remote: {} request(s), {} row(s) returned, {} row(s) read",
      u.calls, u.rows_returned, u.rows_read
    );
  }
  out
}

#[cfg(test)]
mod tests {
  use oifind_core::tracker::Strategy;

  use super::*;

  fn report() -> Report {
    Report {
      identities: vec![Identity {
        uid:           7,
        name:          "张三".to_owned(),
        initials:      Some("zs".to_owned()),
        gender:        Gender::Female,
        enroll_middle: Some(2020),
        oierdb_score:  Some(91.5),
        ccf_score:     None,
        ccf_level:     Some(8),
      }],
      steps:      vec![
        Step::Group {
          index:      0,
          strategy:   Strategy::Unscoped,
          calls:      1,
          rows:       3,
          candidates: 3,
        },
        Step::Fetch { calls: 1, rows: 1 },
      ],
    }
  }

  #[test]
  fn table_lists_rows_and_steps() {
    let text = render(&report(), None, OutputFormat::Table);
    assert!(text.contains("张三"));
    assert!(text.contains("91.50"));
    assert!(text.contains("Unscoped"));
    assert!(text.contains("1 result(s), 2 backend call(s)"));
    assert!(!text.contains("remote:"));
  }

  #[test]
  fn json_includes_usage_when_remote() {
    let usage = Usage { calls: 2, rows_returned: 4, rows_read: 10 };
    let text = render(&report(), Some(usage), OutputFormat::Json);
    let v: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(v["data"][0]["uid"], 7);
    assert_eq!(v["steps"][1]["kind"], "fetch");
    assert_eq!(v["usage"]["rows_read"], 10);
  }
}
