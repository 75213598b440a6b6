use {
    criterion::{criterion_group, criterion_main, Criterion, Throughput},
    msgpact::{SchemaRead, SchemaWrite},
    std::hint::black_box,
};

#[derive(SchemaWrite, SchemaRead, Clone)]
struct Record {
    active: bool,
    id: u64,
    name: String,
    scores: Vec<f64>,
}

fn sample() -> Record {
    Record {
        active: true,
        id: 7,
        name: "a reasonably sized name".to_string(),
        scores: (0..32).map(f64::from).collect(),
    }
}

fn bench_record(c: &mut Criterion) {
    let record = sample();
    let bytes = msgpact::serialize(&record).unwrap();

    let mut group = c.benchmark_group("record");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("serialize", |b| {
        b.iter(|| msgpact::serialize(black_box(&record)).unwrap())
    });
    group.bench_function("deserialize", |b| {
        b.iter(|| msgpact::deserialize::<Record>(black_box(&bytes)).unwrap())
    });
    group.finish();
}

fn bench_sequence(c: &mut Criterion) {
    let records: Vec<Record> = (0..64).map(|_| sample()).collect();
    let bytes = msgpact::serialize(&records).unwrap();

    let mut group = c.benchmark_group("sequence");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("serialize", |b| {
        b.iter(|| msgpact::serialize(black_box(&records)).unwrap())
    });
    group.bench_function("deserialize", |b| {
        b.iter(|| msgpact::deserialize::<Vec<Record>>(black_box(&bytes)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_record, bench_sequence);
criterion_main!(benches);
