//! Headless haunted-house run -- a scripted player wanders the house,
//! reports whatever looks wrong, and sets things right again.
//!
//! Run with:
//!   RUST_LOG=umbra_events=debug,umbra_engine=info \
//!     cargo run --example haunted_house -p umbra-engine

use std::cell::RefCell;
use std::rc::Rc;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tracing_subscriber::EnvFilter;
use umbra_engine::prelude::*;

const FRAME_DT: f64 = 1.0 / 30.0;
const SECONDS: usize = 180;

/// What the scripted player does when one of its oscillators fires.
#[derive(Debug, Clone, Copy)]
enum PlayerAction {
    ReportNearest,
    RestoreAround,
    Wander,
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

fn build_house() -> anyhow::Result<NodeGraph> {
    let mut b = TreeBuilder::new();

    let foyer = b.add_top_level("foyer", Vec2::new(0.0, 0.0), AlwaysActiveNode);
    b.preactivate(foyer)?;
    let door = AudioAnimationNode::once().with_audio();
    let front_door = b.add_node(foyer, "front door", Vec2::new(0.0, -2.0), door)?;
    let chain = AudioAnimationNode::looping();
    b.add_node(front_door, "door chain", Vec2::new(0.5, -2.0), chain)?;
    b.add_node(foyer, "rain", Vec2::new(0.0, 0.0), AmbientAudioNode)?;

    let lights = AudioAnimationNode::once();
    let kitchen = b.add_node(foyer, "kitchen lights", Vec2::new(6.0, 0.0), lights)?;
    let kettle = AudioAnimationNode::once().restoring_after(8.0);
    let kettle = b.add_node(kitchen, "kettle", Vec2::new(7.0, 1.0), kettle)?;
    let whistle = AudioAnimationNode::looping().with_audio();
    b.add_node(kettle, "kettle whistle", Vec2::new(7.0, 1.5), whistle)?;
    let cupboard = AudioAnimationNode::once();
    b.add_node(kitchen, "cupboard", Vec2::new(8.0, -1.0), cupboard)?;

    let stairs = b.add_top_level("stairs", Vec2::new(-4.0, 4.0), AudioAnimationNode::once());
    let nursery = AudioAnimationNode::once();
    let nursery = b.add_node(stairs, "nursery", Vec2::new(-4.0, 10.0), nursery)?;
    let music_box = AudioAnimationNode::looping().with_audio();
    b.add_node(nursery, "music box", Vec2::new(-3.0, 11.0), music_box)?;
    let chair = AudioAnimationNode::looping();
    b.add_node(nursery, "rocking chair", Vec2::new(-5.0, 11.0), chair)?;
    let mirror = AudioAnimationNode::once().restoring_after(20.0);
    b.add_top_level("mirror", Vec2::new(3.0, 6.0), mirror);

    Ok(b.finish())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = SessionConfig::default();
    config.tree.tick_interval_seconds = 4.0;
    config.tree.tick_delay_seconds = 1.0;
    config.tree.ghost_event_chance = 0.3;
    config.tree.seed = Some(1313);
    let mut session = Session::new(build_house()?, config)?;

    let mirror = session
        .tree()
        .graph()
        .find_by_name("mirror")
        .ok_or_else(|| anyhow::anyhow!("scene has no mirror"))?;
    let trigger = ReportTrigger::new(mirror).with_hint("Press F to report the mirror");
    session.add_report_trigger(trigger)?;

    let ghost_reports = Rc::new(RefCell::new(Vec::<GhostReport>::new()));
    let sink = Rc::clone(&ghost_reports);
    session.subscribe_ghost_reports(move |report: &GhostReport| {
        sink.borrow_mut().push(report.clone());
    });

    let mut rng = Pcg64::seed_from_u64(99);
    let mut curiosity = Oscillator::new(
        "curiosity",
        6.0,
        2.0,
        vec![
            SignalEntry::new(PlayerAction::Wander),
            SignalEntry::new(PlayerAction::ReportNearest)
                .with_probability(0.7)
                .with_delay(1.0),
        ],
        &mut rng,
    )?;
    let restore = SignalEntry::new(PlayerAction::RestoreAround).with_probability(0.8);
    let mut tidy = Oscillator::new("tidy", 15.0, 5.0, vec![restore], &mut rng)?;

    let nodes = session.tree().graph().depth_first();
    let mut player = Vec2::ZERO;
    let mut reports_made = 0usize;
    let mut cues_seen = 0usize;
    let mut ticks = 0usize;

    for _ in 0..(SECONDS as f64 / FRAME_DT) as usize {
        ticks += session.on_frame(FRAME_DT).len();
        cues_seen += session.drain_cues().len();

        let mut actions = curiosity.advance(FRAME_DT, &mut rng);
        actions.extend(tidy.advance(FRAME_DT, &mut rng));
        for action in actions {
            match action {
                PlayerAction::Wander => {
                    let target = nodes[rng.gen_range(0..nodes.len())];
                    player = session.tree().graph().position(target).unwrap_or(player);
                }
                PlayerAction::ReportNearest => {
                    let graph = session.tree().graph();
                    let distance = |id: NodeId| {
                        graph
                            .position(id)
                            .map_or(f64::MAX, |p| p.distance_squared(player))
                    };
                    let nearest = nodes
                        .iter()
                        .copied()
                        .min_by(|a, b| distance(*a).total_cmp(&distance(*b)));
                    if let Some(node) = nearest {
                        session.report_activity(node, "player");
                        reports_made += 1;
                    }
                }
                PlayerAction::RestoreAround => {
                    session.restore_near(player, 3.0);
                }
            }
        }
    }

    let snapshot = session.tree().capture_snapshot();
    let mirror_hint = session.hint_for(mirror).unwrap_or(DEFAULT_REPORT_HINT).to_owned();
    session.teardown();

    println!("haunted house: {SECONDS}s simulated, {ticks} ticks, {cues_seen} cues");
    println!(
        "player reports: {reports_made}, ghost sightings confirmed: {}",
        ghost_reports.borrow().len()
    );
    for report in ghost_reports.borrow().iter() {
        println!(
            "  tick {:>3}: {} at ({:.1}, {:.1})",
            report.tick, report.node_name, report.position.x, report.position.y
        );
    }
    println!("mirror hint: {mirror_hint}");
    println!("final state (hash {}):", &snapshot.hash[..16]);
    for node in &snapshot.nodes {
        let flag = match (node.state.activated(), node.state.activated_by_ghost()) {
            (true, true) => "ghost",
            (true, false) => "active",
            _ => "-",
        };
        println!("  {:<16} {:<16} {flag}", node.name, node.kind);
    }
    Ok(())
}
