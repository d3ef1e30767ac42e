//! Benchmarks for score extraction and result merging

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use psy::batch::{merge_outcomes, select_scores, Outcome, Selection, CHAT_ID_FIELD};
use psy::table::{Row, Table};
use std::collections::HashMap;

const REPLY: &str = "Clarity: 4/5. Accuracy: 3.5 out of 5, with one factual slip. \
    Completeness: 2. Overall I would rate this answer 3.25, or roughly 65%.";

fn benchmark_select_scores(c: &mut Criterion) {
    for selection in [Selection::First, Selection::Last, Selection::All] {
        c.bench_function(&format!("select_scores_{selection}"), |b| {
            b.iter(|| select_scores(black_box(REPLY), selection));
        });
    }
}

fn benchmark_merge(c: &mut Criterion) {
    let mut table = Table::new(["id", "answer", CHAT_ID_FIELD]);
    let mut outcomes = HashMap::new();
    for i in 0..1000 {
        let id = format!("chat-{i}");
        let mut row = Row::new();
        row.set("id", i.to_string());
        row.set("answer", "An answer");
        row.set(CHAT_ID_FIELD, id.as_str());
        table.push_row(row);
        outcomes.insert(id, Outcome::success(REPLY, select_scores(REPLY, Selection::All)));
    }

    c.bench_function("merge_outcomes_1000_rows", |b| {
        b.iter(|| {
            let mut table = table.clone();
            merge_outcomes(&mut table, black_box(&outcomes), "score")
        });
    });
}

criterion_group!(benches, benchmark_select_scores, benchmark_merge);
criterion_main!(benches);
