//! End-to-end activation scenarios on small hand-authored scenes.

use umbra_events::prelude::*;

fn config(chance: f64, reversion: Option<f64>) -> TreeConfig {
    TreeConfig {
        ghost_event_chance: chance,
        ghost_to_normal_seconds: reversion,
        seed: Some(2024),
        ..Default::default()
    }
}

// -- normal propagation -----------------------------------------------------

#[test]
fn first_tick_activates_nothing_without_an_active_node() {
    // root → A → B, nothing active, normal branch only.
    let mut builder = TreeBuilder::new();
    let a = builder.add_top_level("A", Vec2::ZERO, AudioAnimationNode::once());
    let b = builder
        .add_node(a, "B", Vec2::ZERO, AudioAnimationNode::once())
        .unwrap();
    let mut tree = ActivationTree::new(builder.finish(), config(0.0, Some(5.0)))
        .unwrap();

    for _ in 0..20 {
        let outcome = tree.tick().unwrap();
        assert_eq!(outcome.activated, None);
    }
    assert_eq!(tree.state(a), Some(NodeState::INACTIVE));
    assert_eq!(tree.state(b), Some(NodeState::INACTIVE));
}

#[test]
fn activation_spreads_one_generation_per_tick() {
    // hall (active) → corridor → study → desk
    let mut builder = TreeBuilder::new();
    let hall = builder.add_top_level("hall", Vec2::ZERO, AlwaysActiveNode);
    let corridor = builder
        .add_node(hall, "corridor", Vec2::ZERO, AudioAnimationNode::once())
        .unwrap();
    let study = builder
        .add_node(corridor, "study", Vec2::ZERO, AudioAnimationNode::once())
        .unwrap();
    let desk = builder
        .add_node(study, "desk", Vec2::ZERO, AudioAnimationNode::once())
        .unwrap();
    builder.preactivate(hall).unwrap();
    let mut tree = ActivationTree::new(builder.finish(), config(0.0, None))
        .unwrap();

    assert_eq!(tree.tick().unwrap().activated, Some(corridor));
    assert_eq!(tree.tick().unwrap().activated, Some(study));
    assert_eq!(tree.tick().unwrap().activated, Some(desk));
    assert_eq!(tree.tick().unwrap().activated, None);
    for id in [corridor, study, desk] {
        assert!(tree.state(id).unwrap().is_normal_active());
    }
}

#[test]
fn deterministic_strategy_activates_b_without_ghost_flag() {
    let mut builder = TreeBuilder::new();
    let a = builder.add_top_level("A", Vec2::ZERO, AudioAnimationNode::once());
    let b = builder
        .add_node(a, "B", Vec2::ZERO, AudioAnimationNode::once())
        .unwrap();
    builder.preactivate(a).unwrap();
    let mut tree = ActivationTree::new(builder.finish(), config(0.0, Some(5.0)))
        .unwrap()
        .with_selection_strategy(Fixed(b));

    let outcome = tree.tick().unwrap();
    assert_eq!(outcome.branch, Branch::Normal);
    assert_eq!(outcome.activated, Some(b));
    let state = tree.state(b).unwrap();
    assert!(state.activated());
    assert!(!state.activated_by_ghost());
}

// -- ghost branch -----------------------------------------------------------

#[test]
fn ghost_chance_one_always_activates_the_chosen_leaf() {
    let mut builder = TreeBuilder::new();
    let attic = builder.add_top_level("attic", Vec2::ZERO, AudioAnimationNode::once());
    let leaf = builder
        .add_node(attic, "music box", Vec2::ZERO, AudioAnimationNode::once())
        .unwrap();
    let mut tree = ActivationTree::new(builder.finish(), config(1.0, Some(5.0)))
        .unwrap()
        .with_ghost_selection_strategy(Fixed(leaf));

    for _ in 0..10 {
        let outcome = tree.tick().unwrap();
        assert_eq!(outcome.branch, Branch::Ghost);
        assert_eq!(outcome.activated, Some(leaf));
        assert!(tree.state(leaf).unwrap().is_ghost_active());
        assert!(tree.restore_node(leaf));
    }
}

#[test]
fn ghost_candidates_exclude_children_of_active_nodes() {
    let mut builder = TreeBuilder::new();
    let kitchen = builder.add_top_level("kitchen", Vec2::ZERO, AlwaysActiveNode);
    let kettle = builder
        .add_node(kitchen, "kettle", Vec2::ZERO, AudioAnimationNode::once())
        .unwrap();
    let garden = builder.add_top_level("garden", Vec2::ZERO, AudioAnimationNode::once());
    let swing = builder
        .add_node(garden, "swing", Vec2::ZERO, AudioAnimationNode::once())
        .unwrap();
    builder.preactivate(kitchen).unwrap();
    let never = |_: &[NodeId], _: &NodeGraph, _: &mut dyn rand::RngCore| -> Option<NodeId> {
        None
    };
    let mut tree = ActivationTree::new(builder.finish(), config(1.0, Some(5.0)))
        .unwrap()
        .with_ghost_selection_strategy(never);

    tree.tick();
    assert_eq!(tree.nodes_with_no_active_parent(), &[garden, swing]);
    assert!(!tree.nodes_with_no_active_parent().contains(&kettle));
}

// -- ghost reversion --------------------------------------------------------

#[test]
fn ghost_child_of_normal_parent_reverts_after_five_seconds() {
    let mut builder = TreeBuilder::new();
    let p = builder.add_top_level("P", Vec2::ZERO, AlwaysActiveNode);
    let a = builder
        .add_node(p, "A", Vec2::ZERO, AudioAnimationNode::looping())
        .unwrap();
    builder.preactivate(p).unwrap();
    builder
        .set_initial_state(a, NodeState::new(true, true))
        .unwrap();
    let mut tree = ActivationTree::new(builder.finish(), config(0.0, Some(5.0)))
        .unwrap()
        .with_selection_strategy(FirstCandidate);
    tree.tick();

    let mut flips = 0;
    let mut was_ghost = true;
    for _ in 0..40 {
        tree.frame(0.25);
        let state = tree.state(a).unwrap();
        assert!(state.activated());
        if was_ghost && !state.activated_by_ghost() {
            flips += 1;
        }
        was_ghost = state.activated_by_ghost();
    }
    assert_eq!(flips, 1);
    assert!(tree.state(a).unwrap().is_normal_active());
    assert!(tree.state(p).unwrap().is_normal_active());
}

#[test]
fn ghost_becomes_eligible_for_reversion_once_its_parent_activates() {
    // The ghost lands under an inactive parent; the parent is then reached by
    // normal propagation, which starts the reversion clock.
    let mut builder = TreeBuilder::new();
    let hall = builder.add_top_level("hall", Vec2::ZERO, AlwaysActiveNode);
    let mirror = builder
        .add_node(hall, "mirror", Vec2::ZERO, AudioAnimationNode::once())
        .unwrap();
    let face = builder
        .add_node(mirror, "face", Vec2::ZERO, AudioAnimationNode::once())
        .unwrap();
    builder.preactivate(hall).unwrap();
    let mut tree = ActivationTree::new(builder.finish(), config(0.0, Some(2.0)))
        .unwrap();

    assert!(tree.activate_node(face, true));
    tree.tick();
    assert_eq!(
        tree.state(mirror).map(NodeState::is_normal_active),
        Some(true)
    );
    assert_eq!(tree.ghost_timer(face), Some(2.0));

    tree.frame(1.0);
    tree.frame(1.0);
    assert!(tree.state(face).unwrap().is_normal_active());
}

#[test]
fn radius_restore_silently_drops_pending_timer() {
    let mut builder = TreeBuilder::new();
    let p = builder.add_top_level("P", Vec2::new(100.0, 100.0), AlwaysActiveNode);
    let a = builder
        .add_node(p, "A", Vec2::new(1.0, 1.0), AudioAnimationNode::once())
        .unwrap();
    builder.preactivate(p).unwrap();
    builder
        .set_initial_state(a, NodeState::new(true, true))
        .unwrap();
    let mut tree = ActivationTree::new(builder.finish(), config(0.0, Some(3.0)))
        .unwrap();
    tree.tick();
    assert!(tree.ghost_timer(a).is_some());

    assert_eq!(tree.restore_activated_nodes_near(Vec2::ZERO, 2.0), vec![a]);
    tree.frame(5.0);
    assert_eq!(tree.state(a), Some(NodeState::INACTIVE));
    assert!(tree.state(p).unwrap().is_normal_active());
    assert_eq!(tree.ghost_timers().count(), 0);
}

// -- cues -------------------------------------------------------------------

#[test]
fn cues_follow_lifecycle_calls() {
    let mut builder = TreeBuilder::new();
    let room = builder.add_top_level("room", Vec2::ZERO, AlwaysActiveNode);
    let rain = builder
        .add_node(room, "rain", Vec2::ZERO, AmbientAudioNode)
        .unwrap();
    let clock = builder
        .add_node(
            room,
            "clock",
            Vec2::ZERO,
            AudioAnimationNode::looping().with_audio(),
        )
        .unwrap();
    builder.preactivate(room).unwrap();
    let mut tree = ActivationTree::new(builder.finish(), config(0.0, None))
        .unwrap()
        .with_selection_strategy(Fixed(clock));

    tree.tick();
    let cues = tree.drain_cues();
    assert_eq!(
        cues,
        vec![
            QueuedCue {
                node: rain,
                cue: Cue::EnsureAudioPlaying
            },
            QueuedCue {
                node: clock,
                cue: Cue::EnsureAudioPlaying
            },
            QueuedCue {
                node: clock,
                cue: Cue::PlayAnimation { looping: true }
            },
        ]
    );

    tree.restore_node(clock);
    assert_eq!(
        tree.drain_cues(),
        vec![QueuedCue {
            node: clock,
            cue: Cue::ReverseAnimation
        }]
    );
    assert!(tree.drain_cues().is_empty());
}
