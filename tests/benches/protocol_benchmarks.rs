//! # Kestrel-Chain Protocol Benchmarks
//!
//! Hot paths of a syncing node: framing blocks on the wire, verifying chain
//! proofs and checking proof of work.
//!
//! ```bash
//! cargo bench --package kc-tests --bench protocol_benchmarks
//! cargo bench --package kc-tests --bench protocol_benchmarks -- wire
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kc_01_block_model::{Block, Body, Transaction};
use kc_04_blockchain::test_utils::{extend, funded_blockchain, mine_next_with, test_blockchain};
use kc_05_wire_protocol::{Message, MessageFactory};
use shared_types::Address;
use tokio::runtime::Runtime;

const MINER: Address = Address([0xBE; 20]);

fn runtime() -> Runtime {
    Runtime::new().expect("tokio runtime")
}

/// Block on the test chain carrying `count` transactions.
fn block_with_transactions(count: usize) -> Block {
    runtime().block_on(async {
        let senders: Vec<Address> = (0..count)
            .map(|i| {
                let mut sender = [0u8; 20];
                sender[..8].copy_from_slice(&(i as u64 + 1).to_be_bytes());
                Address(sender)
            })
            .collect();
        let chain = funded_blockchain(senders.iter().map(|sender| (*sender, 1_000)));
        let transactions = senders
            .into_iter()
            .map(|sender| Transaction::new(sender, MINER, 10, 1, 0, vec![]).expect("valid tx"))
            .collect();
        let body = Body::new(MINER, vec![], transactions).expect("valid body");
        mine_next_with(&chain, body).await
    })
}

fn bench_wire(c: &mut Criterion) {
    let mut group = c.benchmark_group("wire");
    for count in [0usize, 100, 1_000] {
        let message = Message::block(block_with_transactions(count));
        let frame = MessageFactory::encode(&message);

        group.bench_with_input(BenchmarkId::new("encode_block", count), &message, |b, m| {
            b.iter(|| MessageFactory::encode(black_box(m)))
        });
        group.bench_with_input(BenchmarkId::new("parse_block", count), &frame, |b, f| {
            b.iter(|| MessageFactory::parse(black_box(f)).expect("valid frame"))
        });
    }
    group.finish();
}

fn bench_chain_proof(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_proof");
    let rt = runtime();
    for length in [10usize, 200] {
        let (proof, policy, genesis) = rt.block_on(async {
            let chain = test_blockchain();
            extend(&chain, length, MINER).await;
            let proof = chain.chain_proof().await.expect("proof of own chain");
            (proof, chain.policy().clone(), chain.genesis_hash())
        });
        group.bench_with_input(BenchmarkId::new("verify", length), &proof, |b, p| {
            b.iter(|| p.verify(black_box(&policy), &genesis).expect("valid proof"))
        });
    }
    group.finish();
}

fn bench_proof_of_work(c: &mut Criterion) {
    let block = block_with_transactions(0);
    c.bench_function("header/verify_proof_of_work", |b| {
        b.iter(|| black_box(&block.header).verify_proof_of_work())
    });
    c.bench_function("header/hash", |b| b.iter(|| black_box(&block.header).hash()));
}

criterion_group!(
    name = protocol_benches;
    config = Criterion::default().sample_size(50);
    targets = bench_wire, bench_chain_proof, bench_proof_of_work,
);

criterion_main!(protocol_benches);
