use std::collections::BTreeSet;

use ben_or::{Error, Health, NodeState, Result, Value};
use net::Net;
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use rand::{prelude::StdRng, SeedableRng};


static INIT: std::sync::Once = std::sync::Once::new();

fn init() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

#[test]
fn test_four_nodes_one_fault_decide_zero_in_round_one() -> Result<()> {
    init();
    let initials = [Value::Zero, Value::Zero, Value::One, Value::Zero];
    let mut net = Net::new(4, 1, &initials, &[3], 0)?;

    net.start_all()?;
    net.drain()?;

    for id in 0..3 {
        assert_eq!(
            net.procs[id].state(),
            NodeState {
                killed: false,
                current_value: Some(Value::Zero),
                decided: Some(true),
                round: Some(1),
            },
            "node {}",
            id
        );
        assert_eq!(net.procs[id].health(), Health::Healthy);
    }

    // the dormant node: degraded, absent protocol state, and not a single
    // packet ever left it
    assert_eq!(net.procs[3].health(), Health::Degraded);
    assert_eq!(
        net.procs[3].state(),
        NodeState {
            killed: false,
            current_value: None,
            decided: None,
            round: None,
        }
    );
    assert!(net.delivered_packets.iter().all(|p| p.source != 3));
    Ok(())
}

#[test]
fn test_unanimous_network_decides_its_initial_value() -> Result<()> {
    init();
    let initials = [Value::One; 5];
    let mut net = Net::new(5, 1, &initials, &[4], 7)?;

    net.start_all()?;
    net.drain()?;

    for proc in net.honest() {
        let state = proc.state();
        assert_eq!(state.decided, Some(true));
        assert_eq!(state.current_value, Some(Value::One));
    }
    Ok(())
}

#[test]
fn test_split_pair_converges_by_coin() -> Result<()> {
    init();
    // two honest nodes with opposite initial values and a dormant third:
    // every round ties until the coins land together
    let initials = [Value::Zero, Value::One, Value::Zero];
    let mut net = Net::new(3, 1, &initials, &[2], 11)?;

    net.start_all()?;
    let mut rng = StdRng::seed_from_u64(11);
    net.drain_random(&mut rng, 100_000)?;

    let decisions = BTreeSet::from_iter(
        net.honest()
            .map(|proc| (proc.state().decided, proc.state().current_value)),
    );
    assert_eq!(decisions.len(), 1, "honest nodes disagree: {:?}", decisions);

    let (decided, value) = decisions.into_iter().next().unwrap();
    assert_eq!(decided, Some(true));
    assert!(value.unwrap().is_informative());
    Ok(())
}

#[test]
fn test_network_below_quorum_stalls_without_deciding() -> Result<()> {
    init();
    // two dormant nodes where the configuration tolerates one: the two
    // honest survivors can never gather n - f = 3 messages
    let initials = [Value::Zero, Value::Zero, Value::One, Value::One];
    let mut net = Net::new(4, 1, &initials, &[2, 3], 3)?;

    net.start_all()?;
    net.drain()?;

    for proc in net.honest() {
        let state = proc.state();
        assert_eq!(state.decided, Some(false));
        assert_eq!(state.round, Some(1));
    }
    assert_eq!(net.packets_in_flight(), 0);
    Ok(())
}

#[test]
fn test_unreachable_peer_stalls_the_rest() -> Result<()> {
    init();
    // all four honest, but node 0's packets never arrive anywhere; the
    // other three sit one message short of quorum every round
    let initials = [Value::Zero, Value::Zero, Value::Zero, Value::One];
    let mut net = Net::new(4, 0, &initials, &[], 5)?;

    net.start_all()?;
    loop {
        net.drop_packets_from_source(0);
        if !net.deliver_next()? {
            break;
        }
    }

    for proc in &net.procs {
        assert_eq!(proc.state().decided, Some(false));
    }
    Ok(())
}

#[test]
fn test_node_stopped_before_start_never_participates() -> Result<()> {
    init();
    let initials = [Value::One, Value::One, Value::Zero, Value::Zero];
    let mut net = Net::new(4, 1, &initials, &[], 13)?;

    net.procs[0].stop();
    net.start_all()?;
    net.drain()?;

    // the killed node acknowledged everything and did nothing
    assert_eq!(
        net.procs[0].state(),
        NodeState {
            killed: true,
            current_value: Some(Value::One),
            decided: Some(false),
            round: Some(0),
        }
    );
    assert!(net.delivered_packets.iter().all(|p| p.source != 0));

    // the other three still make quorum and settle on the majority of
    // their proposals
    for id in 1..4 {
        let state = net.procs[id].state();
        assert_eq!(state.decided, Some(true), "node {}", id);
        assert_eq!(state.current_value, Some(Value::Zero), "node {}", id);
    }
    Ok(())
}

#[test]
fn test_malformed_payload_is_rejected_without_breaking_the_run() -> Result<()> {
    init();
    let initials = [Value::Zero, Value::Zero, Value::One, Value::Zero];
    let mut net = Net::new(4, 1, &initials, &[3], 0)?;

    net.start_all()?;
    assert!(matches!(
        net.procs[0].deliver(&[0xde, 0xad, 0xbe, 0xef]),
        Err(Error::Encoding(_))
    ));

    net.drain()?;
    for proc in net.honest() {
        assert_eq!(proc.state().decided, Some(true));
        assert_eq!(proc.state().current_value, Some(Value::Zero));
    }
    Ok(())
}

#[test]
fn test_decisions_survive_a_shutdown() -> Result<()> {
    init();
    let initials = [Value::One, Value::One, Value::One, Value::Zero];
    let mut net = Net::new(4, 1, &initials, &[3], 2)?;

    net.start_all()?;
    net.drain()?;
    for proc in &net.procs {
        proc.stop();
    }

    for proc in net.honest() {
        let state = proc.state();
        assert!(state.killed);
        assert_eq!(state.decided, Some(true));
        assert_eq!(state.current_value, Some(Value::One));
    }
    assert!(net.procs[3].state().killed);
    Ok(())
}

#[quickcheck]
fn prop_agreement_and_validity_under_random_delivery(
    f_raw: u8,
    extra: u8,
    seed: u64,
) -> eyre::Result<TestResult> {
    init();
    let f = (f_raw % 3) as usize;
    let n = 2 * f + 1 + (extra % 4) as usize;

    let mut rng = StdRng::seed_from_u64(seed);
    let initials = Vec::from_iter((0..n).map(|_| Value::coin_flip(&mut rng)));
    // exactly f dormant nodes, so quorums are made of the full honest set
    let faulty = Vec::from_iter(n - f..n);

    let mut net = Net::new(n, f, &initials, &faulty, seed)?;
    net.start_all()?;
    net.drain_random(&mut rng, 20_000)?;
    if net.packets_in_flight() > 0 {
        return Ok(TestResult::discard());
    }

    let honest_states = Vec::from_iter(net.honest().map(|proc| proc.state()));

    // every honest node terminates here, and rounds never sit below start
    for state in &honest_states {
        if state.decided != Some(true) {
            return Ok(TestResult::failed());
        }
        if state.round < Some(1) {
            return Ok(TestResult::failed());
        }
    }

    // agreement: one decided value across the whole honest set
    let decided = BTreeSet::from_iter(honest_states.iter().map(|s| s.current_value));
    if decided.len() != 1 {
        return Ok(TestResult::failed());
    }

    // validity: a unanimous start decides the unanimous value
    let honest_initials = BTreeSet::from_iter(initials[..n - f].iter().copied());
    if honest_initials.len() == 1 {
        let unanimous = Some(*honest_initials.iter().next().unwrap());
        if decided.into_iter().next().unwrap() != unanimous {
            return Ok(TestResult::failed());
        }
    }

    // with n >= 3f + 1 the first round's votes always clear a threshold
    if n >= 3 * f + 1 {
        for state in &honest_states {
            if state.round != Some(1) {
                return Ok(TestResult::failed());
            }
        }
    }

    Ok(TestResult::passed())
}

#[quickcheck]
fn prop_faulty_nodes_never_send(f_raw: u8, seed: u64) -> eyre::Result<TestResult> {
    init();
    let f = 1 + (f_raw % 2) as usize;
    let n = 3 * f + 1;

    let mut rng = StdRng::seed_from_u64(seed);
    let initials = Vec::from_iter((0..n).map(|_| Value::coin_flip(&mut rng)));
    let faulty = Vec::from_iter(0..f);

    let mut net = Net::new(n, f, &initials, &faulty, seed)?;
    net.start_all()?;
    net.drain_random(&mut rng, 20_000)?;

    for &id in &faulty {
        if net.procs[id].health() != Health::Degraded {
            return Ok(TestResult::failed());
        }
        if net.delivered_packets.iter().any(|p| p.source == id) {
            return Ok(TestResult::failed());
        }
    }
    Ok(TestResult::passed())
}
