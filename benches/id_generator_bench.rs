//! # 标识符生成基准测试

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use htxp::utils::{OrderIdGenerator, generate_name, generate_order_no, generate_random_password, md5_hex};

fn order_id_benchmark(c: &mut Criterion) {
    let generator = OrderIdGenerator::new();

    c.bench_function("order_id_next", |b| {
        b.iter(|| generator.next_id(black_box("wechat")));
    });

    c.bench_function("order_no_uuid", |b| {
        b.iter(generate_order_no);
    });
}

fn string_benchmark(c: &mut Criterion) {
    c.bench_function("generate_name_16", |b| {
        b.iter(|| generate_name(black_box(16)));
    });

    c.bench_function("generate_password_mixed_24", |b| {
        b.iter(|| generate_random_password(black_box(24), true, true, true));
    });

    c.bench_function("md5_hex_short", |b| {
        b.iter(|| md5_hex(black_box("password123")));
    });
}

criterion_group!(benches, order_id_benchmark, string_benchmark);
criterion_main!(benches);
