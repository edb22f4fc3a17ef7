//! Stake-input behavior against a mock chain and a live registry.

use num_bigint::BigUint;

use zkas_accumulator::AccumulatorRegistry;
use zkas_arith::GroupParams;
use zkas_common::{
    ChainCursor, ChecksumDigest, Denomination, KeyId, ProtocolParams, PubKey, ScriptPubKey,
    SourceTx, TxId, TxIn, TxOut,
};
use zkas_stake::{
    LedgerStake, StakeError, StakeInput, ZkSpender, ZkStake, STAKE_SECURITY_LEVEL,
};
use zkas_test_fixtures::{prime_coin, seal_checkpoints, MemoryKeyStore, MockChain};

fn protocol() -> ProtocolParams {
    ProtocolParams {
        activation_height: 100,
        checkpoint_interval: 10,
        mint_maturity: 10,
        ..ProtocolParams::default()
    }
}

fn empty_registry() -> AccumulatorRegistry {
    AccumulatorRegistry::in_memory(GroupParams::dev().clone(), protocol())
}

#[test]
fn zk_modifier_comes_from_the_first_block_past_the_window() {
    // Reference block at time T; blocks at T, T+1800, T+3700. The first
    // block exceeding the 3600 s window is the one at T+3700.
    let t = 1_000_000i64;
    let mut chain = MockChain::new();
    for h in 0..100 {
        chain.push_block(t - (100 - h) as i64);
    }
    chain.push_block(t); // height 100, the reference
    chain.push_block(t + 1800); // height 101
    chain.push_block(t + 3700); // height 102
    chain.extend_to(222, 1);

    let source_digest = ChecksumDigest::compose(&[0, 0, 0, 0, 0, 0, 0xfeed_0000, 0x0000_beef]);
    chain.set_digest(102, source_digest);

    // Direct mint-to-stake: tip 222 - depth 120 = 102, rounded down to
    // the checkpoint grid = 100.
    let registry = empty_registry();
    let stake = StakeInput::Zk(ZkStake::from_mint(
        Denomination::Ten,
        BigUint::from(17u32),
    ));
    let from = stake.index_from(&chain, &registry).unwrap();
    assert_eq!(from.height, 100);
    assert_eq!(from.time, t);

    let modifier = stake.modifier(&chain, &registry).unwrap();
    assert_eq!(modifier, source_digest.low64());
    assert_eq!(modifier, 0xfeed_0000_0000_beef);
}

#[test]
fn zk_modifier_fails_when_the_chain_stops_inside_the_window() {
    // Ten seconds per block: the window is never crossed before the tip.
    let mut chain = MockChain::new();
    for h in 0..=222 {
        chain.push_block(h as i64 * 10);
    }
    let registry = empty_registry();
    let stake = StakeInput::Zk(ZkStake::from_mint(Denomination::One, BigUint::from(3u32)));
    assert!(matches!(
        stake.modifier(&chain, &registry),
        Err(StakeError::ModifierUnavailable)
    ));
}

#[test]
fn zk_index_from_resolves_the_spend_checksum_height() -> anyhow::Result<()> {
    let params = GroupParams::dev();
    let mut chain = MockChain::with_height(140, 60);
    let mut registry = AccumulatorRegistry::in_memory(params.clone(), protocol());
    chain.push_mint(105, Denomination::Ten, prime_coin(params, 0));
    seal_checkpoints(&mut chain, &mut registry, 100, 130)?;

    // The spend carries the checksum current at mint time, first seen at
    // the checkpoint at height 100.
    let checksum = chain
        .block_at(100)
        .unwrap()
        .checkpoint_digest
        .checksum_for(Denomination::Ten);
    let stake = StakeInput::Zk(ZkStake::from_spend(
        Denomination::Ten,
        BigUint::from(123u32),
        checksum,
    ));
    let from = stake.index_from(&chain, &registry).unwrap();
    assert_eq!(from.height, 100);

    // An unknown checksum resolves to nothing rather than faulting.
    let unknown = StakeInput::Zk(ZkStake::from_spend(
        Denomination::Ten,
        BigUint::from(123u32),
        0xdead_0001,
    ));
    assert!(unknown.index_from(&chain, &registry).is_none());

    // A reorg that drops the recorded height also resolves to nothing.
    chain.truncate_to(90);
    assert!(stake.index_from(&chain, &registry).is_none());
    Ok(())
}

#[test]
fn ledger_stake_resolves_and_reads_the_kernel_modifier() {
    let mut chain = MockChain::with_height(150, 60);
    let registry = empty_registry();
    let txid = TxId([0x42u8; 32]);
    chain.register_tx(130, txid);
    chain.set_modifier(130, 0x5151_5151);

    let stake = StakeInput::Ledger(
        LedgerStake::new(
            SourceTx {
                txid,
                outputs: vec![TxOut {
                    value: 500,
                    script: ScriptPubKey::PayToPubkey(PubKey([2u8; 33])),
                }],
            },
            0,
        )
        .unwrap(),
    );
    assert_eq!(stake.index_from(&chain, &registry).unwrap().height, 130);
    assert_eq!(stake.modifier(&chain, &registry).unwrap(), 0x5151_5151);

    // An unconfirmed source transaction cannot resolve.
    let orphan = StakeInput::Ledger(
        LedgerStake::new(
            SourceTx {
                txid: TxId([0x43u8; 32]),
                outputs: vec![TxOut {
                    value: 1,
                    script: ScriptPubKey::PayToPubkey(PubKey([2u8; 33])),
                }],
            },
            0,
        )
        .unwrap(),
    );
    assert!(orphan.index_from(&chain, &registry).is_none());
    assert!(matches!(
        orphan.modifier(&chain, &registry),
        Err(StakeError::Unresolved)
    ));
}

struct RecordingSpender {
    last_level: Option<u32>,
}

impl ZkSpender for RecordingSpender {
    fn create_spend(
        &mut self,
        denomination: Denomination,
        serial: &BigUint,
        security_level: u32,
        _hash_tx_out: &TxId,
    ) -> Result<TxIn, String> {
        self.last_level = Some(security_level);
        Ok(TxIn::ZkSpend(zkas_common::ZkSpend {
            denomination,
            serial: serial.clone(),
            checksum: 0,
            proof: vec![0xab],
        }))
    }
}

#[test]
fn zk_tx_in_delegates_to_the_spender_at_the_fixed_level() {
    let stake = StakeInput::Zk(ZkStake::from_spend(
        Denomination::Five,
        BigUint::from(77u32),
        9,
    ));
    let mut spender = RecordingSpender { last_level: None };
    let tx_in = stake.create_tx_in(&mut spender, &TxId::ZERO).unwrap();
    assert_eq!(spender.last_level, Some(STAKE_SECURITY_LEVEL));
    match tx_in {
        TxIn::ZkSpend(spend) => {
            assert_eq!(spend.denomination, Denomination::Five);
            assert_eq!(spend.serial, BigUint::from(77u32));
        }
        other => panic!("expected a zk spend input, got {other:?}"),
    }
}

#[test]
fn ledger_tx_out_normalizes_to_pay_to_key() {
    let mut keys = MemoryKeyStore::new();
    let id = KeyId([6u8; 20]);
    let resolved = PubKey([3u8; 33]);
    keys.insert(id, resolved);

    let stake = |script: ScriptPubKey| {
        StakeInput::Ledger(
            LedgerStake::new(
                SourceTx {
                    txid: TxId([9u8; 32]),
                    outputs: vec![TxOut { value: 10, script }],
                },
                0,
            )
            .unwrap(),
        )
    };

    // Pay-to-key passes through.
    let direct = stake(ScriptPubKey::PayToPubkey(PubKey([2u8; 33])))
        .create_tx_out(&mut keys)
        .unwrap();
    assert_eq!(direct.script, ScriptPubKey::PayToPubkey(PubKey([2u8; 33])));
    assert_eq!(direct.value, 0);

    // Pay-to-address resolves through the key store.
    let converted = stake(ScriptPubKey::PayToPubkeyHash(id))
        .create_tx_out(&mut keys)
        .unwrap();
    assert_eq!(converted.script, ScriptPubKey::PayToPubkey(resolved));

    // Unknown address: the wallet cannot sign for it.
    assert!(matches!(
        stake(ScriptPubKey::PayToPubkeyHash(KeyId([7u8; 20]))).create_tx_out(&mut keys),
        Err(StakeError::MissingKey)
    ));

    // Anything fancier is rejected outright.
    assert!(matches!(
        stake(ScriptPubKey::Raw(vec![0x51])).create_tx_out(&mut keys),
        Err(StakeError::UnsupportedScript)
    ));
}

#[test]
fn zk_tx_out_pays_a_fresh_key_with_no_coin_data() {
    let mut keys = MemoryKeyStore::new();
    let stake = StakeInput::Zk(ZkStake::from_mint(Denomination::One, BigUint::from(4u32)));
    let out = stake.create_tx_out(&mut keys).unwrap();
    assert_eq!(out.value, 0);
    assert!(matches!(out.script, ScriptPubKey::PayToPubkey(_)));
}
