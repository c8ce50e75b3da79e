//! Concrete node variants.
//!
//! [`NodeKind`] is the tagged set of behaviors a scene is authored with. Each
//! variant implements [`NodeBehavior`]; `NodeKind` dispatches to it. Scenes
//! that need something else wrap it in [`NodeKind::Custom`].

use serde::{Deserialize, Serialize};

use crate::node::{Cue, NodeBehavior, NodeContext, NodeRequest};

// ---------------------------------------------------------------------------
// AudioAnimationNode
// ---------------------------------------------------------------------------

/// Playback direction of an animated node, as last cued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Playback {
    #[default]
    Idle,
    Forward,
    Reverse,
}

/// A node that plays an animation when activated and plays it backwards when
/// restored. Optionally keeps an audio source running and restores itself
/// after a fixed number of seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioAnimationNode {
    /// Loop the animation while active instead of playing it once.
    pub looping: bool,
    /// Seconds until the node restores itself. `None` never auto-restores.
    pub deactivation_seconds: Option<f64>,
    /// Whether the node carries an audio source to keep playing.
    pub has_audio: bool,
    #[serde(skip)]
    auto_restore_in: Option<f64>,
    #[serde(skip)]
    playback: Playback,
}

impl AudioAnimationNode {
    /// Plays once, never auto-restores, no audio.
    pub fn once() -> Self {
        Self::default()
    }

    pub fn looping() -> Self {
        Self {
            looping: true,
            ..Self::default()
        }
    }

    pub fn with_audio(mut self) -> Self {
        self.has_audio = true;
        self
    }

    pub fn restoring_after(mut self, seconds: f64) -> Self {
        self.deactivation_seconds = Some(seconds);
        self
    }

    pub fn playback(&self) -> Playback {
        self.playback
    }

    /// Seconds left before the pending auto-restore fires.
    pub fn auto_restore_in(&self) -> Option<f64> {
        self.auto_restore_in
    }
}

impl NodeBehavior for AudioAnimationNode {
    fn update(&mut self, ctx: &mut NodeContext<'_>) -> NodeRequest {
        if self.has_audio {
            ctx.emit(Cue::EnsureAudioPlaying);
        }
        NodeRequest::Idle
    }

    fn activate(&mut self, ctx: &mut NodeContext<'_>) {
        self.auto_restore_in = self.deactivation_seconds.filter(|s| *s >= 0.0);
        self.playback = Playback::Forward;
        ctx.emit(Cue::PlayAnimation {
            looping: self.looping,
        });
    }

    fn restore(&mut self, ctx: &mut NodeContext<'_>) {
        self.auto_restore_in = None;
        self.playback = Playback::Reverse;
        ctx.emit(Cue::ReverseAnimation);
    }

    fn advance(&mut self, dt: f64, _ctx: &mut NodeContext<'_>) -> NodeRequest {
        match self.auto_restore_in.as_mut() {
            Some(remaining) => {
                *remaining -= dt;
                if *remaining <= 0.0 {
                    self.auto_restore_in = None;
                    NodeRequest::Restore
                } else {
                    NodeRequest::Idle
                }
            }
            None => NodeRequest::Idle,
        }
    }
}

// ---------------------------------------------------------------------------
// AmbientAudioNode
// ---------------------------------------------------------------------------

/// Background sound (rain, wind) that is kept playing on every tick. Its
/// activation carries no extra behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbientAudioNode;

impl NodeBehavior for AmbientAudioNode {
    fn update(&mut self, ctx: &mut NodeContext<'_>) -> NodeRequest {
        ctx.emit(Cue::EnsureAudioPlaying);
        NodeRequest::Idle
    }

    fn activate(&mut self, _ctx: &mut NodeContext<'_>) {}

    fn restore(&mut self, _ctx: &mut NodeContext<'_>) {}
}

// ---------------------------------------------------------------------------
// AlwaysActiveNode
// ---------------------------------------------------------------------------

/// Inert node. Used for rooms and anchors that are authored as active and
/// only exist to give their children a parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlwaysActiveNode;

impl NodeBehavior for AlwaysActiveNode {
    fn update(&mut self, _ctx: &mut NodeContext<'_>) -> NodeRequest {
        NodeRequest::Idle
    }

    fn activate(&mut self, _ctx: &mut NodeContext<'_>) {}

    fn restore(&mut self, _ctx: &mut NodeContext<'_>) {}
}

// ---------------------------------------------------------------------------
// NodeKind
// ---------------------------------------------------------------------------

/// The behavior attached to a node.
#[derive(Debug)]
pub enum NodeKind {
    AudioAnimation(AudioAnimationNode),
    AmbientAudio(AmbientAudioNode),
    AlwaysActive(AlwaysActiveNode),
    Custom(Box<dyn NodeBehavior>),
}

impl NodeKind {
    pub fn custom(behavior: impl NodeBehavior + 'static) -> Self {
        NodeKind::Custom(Box::new(behavior))
    }

    /// Short label for logs and snapshots.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::AudioAnimation(_) => "audio_animation",
            NodeKind::AmbientAudio(_) => "ambient_audio",
            NodeKind::AlwaysActive(_) => "always_active",
            NodeKind::Custom(_) => "custom",
        }
    }

    pub fn as_audio_animation(&self) -> Option<&AudioAnimationNode> {
        match self {
            NodeKind::AudioAnimation(node) => Some(node),
            _ => None,
        }
    }

    fn behavior_mut(&mut self) -> &mut dyn NodeBehavior {
        match self {
            NodeKind::AudioAnimation(node) => node as &mut dyn NodeBehavior,
            NodeKind::AmbientAudio(node) => node as &mut dyn NodeBehavior,
            NodeKind::AlwaysActive(node) => node as &mut dyn NodeBehavior,
            NodeKind::Custom(node) => node.as_mut(),
        }
    }
}

impl NodeBehavior for NodeKind {
    fn update(&mut self, ctx: &mut NodeContext<'_>) -> NodeRequest {
        self.behavior_mut().update(ctx)
    }

    fn activate(&mut self, ctx: &mut NodeContext<'_>) {
        self.behavior_mut().activate(ctx)
    }

    fn restore(&mut self, ctx: &mut NodeContext<'_>) {
        self.behavior_mut().restore(ctx)
    }

    fn advance(&mut self, dt: f64, ctx: &mut NodeContext<'_>) -> NodeRequest {
        self.behavior_mut().advance(dt, ctx)
    }
}

impl From<AudioAnimationNode> for NodeKind {
    fn from(node: AudioAnimationNode) -> Self {
        NodeKind::AudioAnimation(node)
    }
}

impl From<AmbientAudioNode> for NodeKind {
    fn from(node: AmbientAudioNode) -> Self {
        NodeKind::AmbientAudio(node)
    }
}

impl From<AlwaysActiveNode> for NodeKind {
    fn from(node: AlwaysActiveNode) -> Self {
        NodeKind::AlwaysActive(node)
    }
}

impl From<Box<dyn NodeBehavior>> for NodeKind {
    fn from(node: Box<dyn NodeBehavior>) -> Self {
        NodeKind::Custom(node)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
