//! End-to-end behaviour of `Finder` against the in-memory backend.

use std::{
  convert::Infallible,
  sync::atomic::{AtomicUsize, Ordering},
  time::Duration,
};

use serde_json::json;

use crate::{
  ErrorKind,
  backend::Backend,
  filter::FilterSpec,
  finder::Finder,
  memory::MemoryBackend,
  model::{Contest, Dataset, Gender, Identity, ParticipationRecord},
  statement::Statement,
  tracker::{Step, Strategy},
  value::ResultSet,
};

// ─── Test doubles ────────────────────────────────────────────────────────────

/// Counts every `execute` call before delegating.
struct Counting<'a> {
  inner: MemoryBackend<'a>,
  calls: AtomicUsize,
}

impl<'a> Counting<'a> {
  fn new(inner: MemoryBackend<'a>) -> Self { Self { inner, calls: AtomicUsize::new(0) } }

  fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl Backend for Counting<'_> {
  type Error = Infallible;

  async fn execute(&self, statement: &Statement) -> Result<ResultSet, Infallible> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.inner.execute(statement).await
  }

  fn max_parameters(&self) -> Option<usize> { self.inner.max_parameters() }
}

struct Failing;

impl Backend for Failing {
  type Error = std::io::Error;

  async fn execute(&self, _: &Statement) -> Result<ResultSet, std::io::Error> {
    Err(std::io::Error::other("store unavailable"))
  }
}

struct Slow;

impl Backend for Slow {
  type Error = Infallible;

  async fn execute(&self, _: &Statement) -> Result<ResultSet, Infallible> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Ok(ResultSet::default())
  }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn identity(uid: i64, name: &str, score: Option<f64>, enroll: i64) -> Identity {
  Identity {
    uid,
    name: name.to_owned(),
    initials: None,
    gender: Gender::Unknown,
    enroll_middle: Some(enroll),
    oierdb_score: score,
    ccf_score: None,
    ccf_level: None,
  }
}

fn contest(id: i64, kind: &str, year: i64) -> Contest {
  Contest {
    id,
    name: format!("{kind}{year}"),
    kind: kind.to_owned(),
    year,
    fall_semester: false,
    full_score: None,
  }
}

fn record(
  id: i64,
  uid: i64,
  contest_id: i64,
  score: Option<f64>,
  province: &str,
  level: &str,
) -> ParticipationRecord {
  ParticipationRecord {
    id,
    oier_uid: uid,
    contest_id,
    school_id: None,
    score,
    rank: Some(id),
    province: Some(province.to_owned()),
    level: Some(level.to_owned()),
  }
}

/// Two identities, one NOI contest, one gold-medal record for A in Beijing.
fn small() -> Dataset {
  Dataset {
    identities: vec![
      identity(2, "B", Some(80.0), 2021),
      identity(1, "A", Some(90.0), 2020),
    ],
    contests: vec![contest(1, "NOI", 2022)],
    schools: Vec::new(),
    records: vec![record(1, 1, 1, Some(500.0), "北京", "金牌")],
  }
}

const PROVINCES: [&str; 3] = ["北京", "上海", "广东"];

/// Forty identities spread over four contests and three provinces.
fn large() -> Dataset {
  let identities = (1..=40)
    .map(|uid| {
      let score = (uid % 7 != 0).then(|| uid as f64 * 1.5);
      let mut i = identity(uid, &format!("oier{uid}"), score, 2015 + uid % 6);
      i.gender = if uid % 2 == 0 { Gender::Female } else { Gender::Male };
      i
    })
    .collect();

  let contests = vec![
    contest(1, "NOI", 2021),
    contest(2, "NOI", 2022),
    contest(3, "CSP提高", 2022),
    contest(4, "NOIP", 2020),
  ];

  let mut records = Vec::new();
  for uid in 1..=40_i64 {
    let province = PROVINCES[(uid % 3) as usize];
    let level = if uid % 5 == 0 { "金牌" } else { "银牌" };
    let score = Some(((uid * 37) % 400) as f64);
    let id = records.len() as i64 + 1;
    records.push(record(id, uid, uid % 4 + 1, score, province, level));
    if uid % 3 == 0 {
      let id = records.len() as i64 + 1;
      records.push(record(id, uid, 2, score, province, level));
    }
  }
  // A record whose contest does not exist never matches.
  records.push(record(999, 1, 42, Some(1.0), "北京", "金牌"));

  Dataset { identities, contests, schools: Vec::new(), records }
}

fn spec(v: serde_json::Value) -> FilterSpec { FilterSpec::from_value(&v).unwrap() }

fn uids(identities: &[Identity]) -> Vec<i64> { identities.iter().map(|i| i.uid).collect() }

// ─── Browse all ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn no_filters_returns_everything_by_score() {
  let mut data = small();
  data.identities.push(identity(3, "C", None, 2019));
  data.identities.push(identity(4, "D", Some(80.0), 2019));
  let backend = Counting::new(MemoryBackend::new(&data));

  let report = Finder::new().find(&backend, &spec(json!({}))).await.unwrap();

  assert_eq!(uids(&report.identities), vec![1, 2, 4, 3]);
  assert_eq!(backend.calls(), 1);
  assert_eq!(report.steps, vec![Step::Fetch { calls: 1, rows: 4 }]);
}

#[tokio::test]
async fn empty_records_list_is_browse_all() {
  let data = small();
  let backend = Counting::new(MemoryBackend::new(&data));

  let report = Finder::new()
    .find(&backend, &spec(json!({ "records": [] })))
    .await
    .unwrap();

  assert_eq!(uids(&report.identities), vec![1, 2]);
  assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn blank_ui_fields_are_ignored() {
  let data = small();
  let backend = MemoryBackend::new(&data);

  let report = Finder::new()
    .find(
      &backend,
      &spec(json!({
        "enroll_year_range": [null, null],
        "gender": null,
        "records": [{ "year_range": [null, null], "province": null }],
      })),
    )
    .await
    .unwrap();

  // The blank group is a tautology over the join: only A has a record.
  assert_eq!(uids(&report.identities), vec![1]);
}

// ─── Narrowing ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_group_selects_matching_identity() {
  let data = small();
  let backend = Counting::new(MemoryBackend::new(&data));

  let report = Finder::new()
    .find(
      &backend,
      &spec(json!({ "records": [{ "contest_type": ["NOI"], "province": ["北京"] }] })),
    )
    .await
    .unwrap();

  assert_eq!(uids(&report.identities), vec![1]);
  assert_eq!(report.identities[0].name, "A");
  assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn contradicting_group_empties_and_stops() {
  let data = small();
  let backend = Counting::new(MemoryBackend::new(&data));

  let report = Finder::new()
    .find(
      &backend,
      &spec(json!({ "records": [
        { "contest_type": ["NOI"], "province": ["北京"] },
        { "contest_type": ["CSP提高"] },
        { "contest_type": ["NOI"] },
      ] })),
    )
    .await
    .unwrap();

  assert!(report.identities.is_empty());
  // First two groups only; the third group and the final fetch never run.
  assert_eq!(backend.calls(), 2);
  assert_eq!(report.steps.len(), 2);
  assert!(matches!(
    report.steps[1],
    Step::Group { index: 1, strategy: Strategy::Enumerated, candidates: 0, .. }
  ));
}

#[tokio::test]
async fn zero_match_first_group_skips_the_rest() {
  let data = large();
  let backend = Counting::new(MemoryBackend::new(&data));

  let report = Finder::new()
    .find(
      &backend,
      &spec(json!({ "records": [
        { "contest_type": "IOI" },
        { "province": ["北京"] },
        { "year_range": [2020, 2022] },
      ] })),
    )
    .await
    .unwrap();

  assert!(report.identities.is_empty());
  assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn explicit_empty_set_excludes_everything_without_calls() {
  let data = large();
  let backend = Counting::new(MemoryBackend::new(&data));

  let report = Finder::new()
    .find(&backend, &spec(json!({ "records": [{ "province": [] }] })))
    .await
    .unwrap();

  assert!(report.identities.is_empty());
  assert_eq!(backend.calls(), 0);
  assert!(matches!(
    report.steps[..],
    [Step::Group { strategy: Strategy::Skipped, .. }]
  ));
}

#[tokio::test]
async fn records_with_missing_contest_never_match() {
  let data = large();
  let backend = MemoryBackend::new(&data);

  // Only the orphaned record scores this low.
  let report = Finder::new()
    .find(&backend, &spec(json!({ "records": [{ "score_range": [null, 1] }] })))
    .await
    .unwrap();

  assert!(report.identities.is_empty());
}

#[tokio::test]
async fn groups_filter_by_school_contest_and_semester() {
  let mut data = large();
  for r in &mut data.records {
    r.school_id = Some(100 + r.oier_uid % 2);
  }
  data.contests[2].fall_semester = true;
  let backend = MemoryBackend::new(&data);

  // Contest 3 is the only autumn contest; uid % 4 == 2 lands there.
  let report = Finder::new()
    .find(
      &backend,
      &spec(json!({ "records": [{ "fall_semester": true, "school_id": 100 }] })),
    )
    .await
    .unwrap();
  let mut got = uids(&report.identities);
  got.sort_unstable();
  assert_eq!(got, (1..=40).filter(|u| u % 4 == 2).collect::<Vec<_>>());

  let report = Finder::new()
    .find(&backend, &spec(json!({ "records": [{ "contest_ids": [1, 4] }] })))
    .await
    .unwrap();
  let mut got = uids(&report.identities);
  got.sort_unstable();
  assert_eq!(got, (1..=40).filter(|u| u % 4 == 0 || u % 4 == 3).collect::<Vec<_>>());
}

// ─── Bootstrap ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn name_and_aggregate_score_narrow_identities() {
  let data = large();
  let backend = MemoryBackend::new(&data);

  // oier3 scores 4.5, oier5 scores 7.5, oier7 has no score.
  let report = Finder::new()
    .find(
      &backend,
      &spec(json!({
        "names": ["oier3", "oier5", "oier7"],
        "min_oierdb_score": 5,
      })),
    )
    .await
    .unwrap();
  assert_eq!(uids(&report.identities), vec![5]);
}

#[tokio::test]
async fn grade_range_uses_injected_year() {
  let data = small();
  let backend = MemoryBackend::new(&data);

  // 2026 - 13 + 7 = 2020
  let report = Finder::new()
    .with_current_year(2026)
    .find(&backend, &spec(json!({ "grade_range": [13, 13] })))
    .await
    .unwrap();
  assert_eq!(uids(&report.identities), vec![1]);

  let report = Finder::new()
    .with_current_year(2027)
    .find(&backend, &spec(json!({ "grade_range": [13, 13] })))
    .await
    .unwrap();
  assert_eq!(uids(&report.identities), vec![2]);
}

#[tokio::test]
async fn bootstrap_feeds_enumeration() {
  let data = large();
  let backend = Counting::new(MemoryBackend::new(&data));

  let report = Finder::new()
    .find(
      &backend,
      &spec(json!({
        "enroll_year_range": [2015, 2015],
        "gender": ["female"],
        "records": [{ "contest_type": ["NOI"] }],
      })),
    )
    .await
    .unwrap();

  let expected: Vec<i64> = data
    .identities
    .iter()
    .filter(|i| i.enroll_middle == Some(2015) && i.gender == Gender::Female)
    .filter(|i| {
      data
        .records
        .iter()
        .any(|r| r.oier_uid == i.uid && matches!(r.contest_id, 1 | 2))
    })
    .map(|i| i.uid)
    .collect();
  let mut got = uids(&report.identities);
  got.sort_unstable();
  assert_eq!(got, expected);

  assert!(matches!(report.steps[0], Step::Bootstrap { calls: 1, .. }));
  assert!(matches!(
    report.steps[1],
    Step::Group { strategy: Strategy::Enumerated, .. }
  ));
}

#[tokio::test]
async fn empty_gender_set_matches_nobody() {
  let data = large();
  let backend = Counting::new(MemoryBackend::new(&data));

  let report = Finder::new()
    .find(&backend, &spec(json!({ "gender": [] })))
    .await
    .unwrap();

  assert!(report.identities.is_empty());
  assert_eq!(backend.calls(), 0);
}

// ─── Invariance ──────────────────────────────────────────────────────────────

fn three_groups() -> [serde_json::Value; 3] {
  [
    json!({ "contest_type": ["NOI", "NOIP"] }),
    json!({ "province": ["北京", "广东"] }),
    json!({ "year_range": [2021, null], "score_range": [null, 350] }),
  ]
}

/// The same three groups evaluated by hand.
fn brute_force(data: &Dataset) -> Vec<i64> {
  let contest = |id: i64| data.contests.iter().find(|c| c.id == id);
  let any = |uid: i64, f: &dyn Fn(&ParticipationRecord, &Contest) -> bool| {
    data
      .records
      .iter()
      .filter(|r| r.oier_uid == uid)
      .any(|r| contest(r.contest_id).is_some_and(|c| f(r, c)))
  };

  let mut matched: Vec<&Identity> = data
    .identities
    .iter()
    .filter(|i| any(i.uid, &|_, c| c.kind == "NOI" || c.kind == "NOIP"))
    .filter(|i| {
      any(i.uid, &|r, _| matches!(r.province.as_deref(), Some("北京" | "广东")))
    })
    .filter(|i| {
      any(i.uid, &|r, c| c.year >= 2021 && r.score.is_some_and(|s| s <= 350.0))
    })
    .collect();
  matched.sort_by(|a, b| {
    let by_score = match (a.oierdb_score, b.oierdb_score) {
      (Some(x), Some(y)) => y.total_cmp(&x),
      (Some(_), None) => std::cmp::Ordering::Less,
      (None, Some(_)) => std::cmp::Ordering::Greater,
      (None, None) => std::cmp::Ordering::Equal,
    };
    by_score.then(a.uid.cmp(&b.uid))
  });
  matched.iter().map(|i| i.uid).collect()
}

#[tokio::test]
async fn group_order_does_not_change_results() {
  let data = large();
  let backend = MemoryBackend::new(&data);
  let [a, b, c] = three_groups();
  let expected = brute_force(&data);
  assert!(!expected.is_empty());

  let orders = [
    [&a, &b, &c],
    [&a, &c, &b],
    [&b, &a, &c],
    [&b, &c, &a],
    [&c, &a, &b],
    [&c, &b, &a],
  ];
  for order in orders {
    let report = Finder::new()
      .find(&backend, &spec(json!({ "records": order })))
      .await
      .unwrap();
    assert_eq!(uids(&report.identities), expected, "order {order:?}");
  }
}

#[tokio::test]
async fn threshold_changes_cost_not_results() {
  let data = large();
  let groups = three_groups();
  let query = spec(json!({ "records": groups }));

  let never = Counting::new(MemoryBackend::new(&data));
  let unscoped = Finder::new().with_threshold(0).find(&never, &query).await.unwrap();

  let always = Counting::new(MemoryBackend::new(&data));
  let enumerated = Finder::new()
    .with_threshold(usize::MAX)
    .find(&always, &query)
    .await
    .unwrap();

  assert_eq!(uids(&unscoped.identities), uids(&enumerated.identities));
  assert_eq!(uids(&unscoped.identities), brute_force(&data));

  let strategies = |steps: &[Step]| {
    steps
      .iter()
      .filter_map(|s| match s {
        Step::Group { strategy, .. } => Some(*strategy),
        _ => None,
      })
      .collect::<Vec<_>>()
  };
  assert!(strategies(&unscoped.steps).iter().all(|s| *s == Strategy::Unscoped));
  assert_eq!(strategies(&enumerated.steps)[0], Strategy::Unscoped);
  assert!(strategies(&enumerated.steps)[1..].iter().all(|s| *s == Strategy::Enumerated));
}

#[tokio::test]
async fn chunked_enumeration_matches_single_shot() {
  let data = large();
  let query = spec(json!({ "records": three_groups() }));

  let plain = MemoryBackend::new(&data);
  let expected = Finder::new()
    .with_threshold(usize::MAX)
    .find(&plain, &query)
    .await
    .unwrap();

  let capped = Counting::new(MemoryBackend::new(&data).with_max_parameters(5));
  let chunked = Finder::new()
    .with_threshold(usize::MAX)
    .find(&capped, &query)
    .await
    .unwrap();

  assert_eq!(uids(&chunked.identities), uids(&expected.identities));
  assert!(capped.calls() > expected.calls());
  assert_eq!(capped.calls(), chunked.calls());
}

#[tokio::test]
async fn limit_truncates_after_ordering() {
  let data = large();
  let backend = MemoryBackend::new(&data);

  let all = Finder::new().find(&backend, &spec(json!({}))).await.unwrap();
  let top = Finder::new()
    .find(&backend, &spec(json!({ "limit": 3 })))
    .await
    .unwrap();

  assert_eq!(uids(&top.identities), uids(&all.identities[..3]));
  assert_eq!(top.identities[0].uid, 40);
}

// ─── Failures ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn backend_failure_is_not_an_empty_result() {
  let err = Finder::new()
    .find(&Failing, &spec(json!({ "records": [{ "contest_type": "NOI" }] })))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Execution);
  assert!(err.to_string().contains("store unavailable"));
}

#[tokio::test]
async fn fetch_without_parameter_room_is_an_error() {
  let data = large();
  let backend = MemoryBackend::new(&data).with_max_parameters(0);

  let err = Finder::new()
    .find(&backend, &spec(json!({ "records": [{ "contest_type": "NOI" }] })))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Execution);
  assert!(err.to_string().contains("no bound parameters"));
}

#[tokio::test]
async fn slow_backend_times_out() {
  let err = Finder::new()
    .with_call_timeout(Duration::from_millis(20))
    .find(&Slow, &spec(json!({})))
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::Timeout(_)));
  assert_eq!(err.kind(), ErrorKind::Execution);
}
