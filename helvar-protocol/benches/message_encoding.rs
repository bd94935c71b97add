use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use helvar_protocol::{
    Message,
    command::{self, Destination},
};

fn encode(c: &mut Criterion) {
    let msg = command::recall_scene(Destination::Device("1.2.3.4"), 1, 5, &[]);
    c.bench_function("encode recall scene", |b| b.iter(|| black_box(&msg).encode()));
}

fn decode(c: &mut Criterion) {
    let frame = "?V:1,C:164,G:12=@1.252.1.1,@1.252.1.2,@1.252.1.3#";
    c.bench_function("decode group reply", |b| {
        b.iter(|| Message::decode(black_box(frame)))
    });

    let answer = (1..=200).map(|g| g.to_string()).collect::<Vec<_>>();
    let stream = answer
        .chunks(50)
        .enumerate()
        .map(|(i, chunk)| {
            let terminator = if i == 3 { '#' } else { '$' };
            format!("?V:1,C:165={}{}", chunk.join(","), terminator)
        })
        .collect::<String>();
    c.bench_function("decode partial groups reply", |b| {
        b.iter(|| Message::decode_partial(black_box(&stream)))
    });
}

criterion_group!(benches, encode, decode);
criterion_main!(benches);
