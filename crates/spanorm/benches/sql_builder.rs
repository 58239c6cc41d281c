use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use spanorm::{
    Db, Direction, MemoryStore, Model, OrderBuilder, OrderParam, Params, SelectBuilder,
    TableDef, WhereBuilder,
};

#[derive(Debug, Clone, Model)]
#[orm(table = "events", rename_all = "PascalCase")]
struct Event {
    #[orm(id)]
    event_id: i64,
    kind: String,
    score: i64,
}

/// `n` columns named col0, col1, ...
fn columns(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("col{i}")).collect()
}

fn bench_clause_builders(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/clauses");

    for n in [1, 5, 10, 50, 100] {
        let cols = columns(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &cols, |b, cols| {
            b.iter(|| {
                let select = SelectBuilder::new().merge(cols.iter().cloned());
                let filter: Params = cols.iter().map(|c| (c.clone(), 1i64)).collect();
                let filter = WhereBuilder::new().merge(&filter);
                let order: OrderParam = cols.iter().map(|c| (c.clone(), Direction::Asc)).collect();
                let order = OrderBuilder::new().merge(&order);
                black_box((select.build(), filter.build(), filter.params(), order.build()));
            });
        });
    }

    group.finish();
}

fn bench_relation_sql(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/relation_sql");
    let db = Db::new(MemoryStore::new());

    // Re-filtering the same column must not grow the statement.
    for n in [1, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut rel = db.relation::<Event>().order_by("Score", Direction::Desc);
                for i in 0..n {
                    rel = rel.filter_eq("Kind", format!("k{i}"));
                }
                black_box(rel.limit(10).sql());
            });
        });
    }

    group.finish();
}

fn bench_memory_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/memory_select");
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");

    for rows in [100, 1_000, 10_000] {
        let store = MemoryStore::new();
        store
            .create_table(
                TableDef::new(Event::TABLE)
                    .columns(Event::COLUMNS.iter().copied())
                    .key(["EventId"]),
            )
            .expect("create table");
        let db = Db::new(store);
        rt.block_on(async {
            let m = db.mutator();
            for i in 0..rows {
                m.insert(&Event {
                    event_id: i,
                    kind: format!("k{}", i % 10),
                    score: i % 97,
                });
            }
            m.apply().await.expect("seed");
        });

        group.bench_with_input(BenchmarkId::from_parameter(rows), &db, |b, db| {
            b.iter(|| {
                let hits = rt.block_on(
                    db.relation::<Event>()
                        .filter_eq("Kind", "k3")
                        .order_by("Score", Direction::Desc)
                        .limit(20)
                        .all(),
                );
                black_box(hits.expect("select"));
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_clause_builders,
    bench_relation_sql,
    bench_memory_select
);
criterion_main!(benches);
