// SPDX-License-Identifier: MIT OR Apache-2.0
//! Splice headless session.
//!
//! Runs a short scripted editing session against the engine and prints the
//! resulting tracks as JSON. Pass a RON settings file as the first argument to
//! override the defaults.

use splice_editor::{
    ControlAction, EditorSettings, Engine, ItemPatch, TrackPatch, UpdateItemCommand,
    UpdateTrackCommand,
};
use splice_mixer::NullSink;
use splice_timeline::{AssetDescriptor, AssetRef, ItemKind, TrackKind};
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "splice_editor=debug".parse::<Directive>() {
        env_filter = env_filter.add_directive(directive);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Splice v{}", env!("CARGO_PKG_VERSION"));

    let settings = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => match EditorSettings::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!("Could not load settings: {e}");
                std::process::exit(1);
            }
        },
        None => EditorSettings::default(),
    };

    if let Err(e) = run(settings) {
        tracing::error!("Session failed: {e}");
        std::process::exit(1);
    }
}

fn run(settings: EditorSettings) -> Result<(), Box<dyn Error>> {
    let mut engine = Engine::new(NullSink::new(), settings);
    engine.subscribe(|event| {
        tracing::info!(
            "Revision {} ({:?}): {} tracks, {:.2}s",
            event.revision,
            event.cause,
            event.tracks.len(),
            event.duration
        );
    });

    engine.apply(ControlAction::AddTrack(TrackKind::Video))?;
    engine.apply(ControlAction::AddTrack(TrackKind::Video))?;
    engine.apply(ControlAction::AddTrack(TrackKind::Audio))?;
    let tracks: Vec<_> = engine.timeline().tracks().map(|t| t.id).collect();
    let &[v1, _, a1] = tracks.as_slice() else {
        return Err("track setup failed".into());
    };

    let intro = AssetDescriptor {
        id: "intro.mp4".to_string(),
        kind: ItemKind::Video,
        reference: AssetRef::new("media/intro.mp4"),
        duration: Some(8.0),
        resolution: Some((1920, 1080)),
    };
    let music = AssetDescriptor {
        id: "theme.ogg".to_string(),
        kind: ItemKind::Audio,
        reference: AssetRef::new("media/theme.ogg"),
        duration: Some(12.0),
        resolution: None,
    };
    engine.add_asset(v1, &intro, 0.0)?;
    engine.add_asset(a1, &music, 0.0)?;

    // Split the intro; the pasted tail lands on V2 since V1 is taken
    engine.apply(ControlAction::Seek(3.0))?;
    engine.apply(ControlAction::SplitAtPlayhead)?;
    let tail = engine
        .timeline()
        .track(v1)
        .and_then(|t| t.items().last())
        .map(|item| item.id);
    if let Some(tail) = tail {
        engine.selection_mut().set([tail]);
        engine.apply(ControlAction::Copy)?;
        engine.apply(ControlAction::Seek(4.0))?;
        engine.apply(ControlAction::Paste)?;
    }

    let music_id = engine
        .timeline()
        .track(a1)
        .and_then(|t| t.items().first())
        .map(|item| item.id);
    if let Some(music_id) = music_id {
        let fades = ItemPatch {
            fade_in: Some(Some(1.0)),
            fade_out: Some(Some(2.0)),
            ..ItemPatch::default()
        };
        engine.execute(Box::new(UpdateItemCommand::new(music_id, fades)))?;
    }

    engine.execute(Box::new(UpdateTrackCommand::new(a1, TrackPatch::muted(true))))?;
    engine.apply(ControlAction::Undo)?;

    engine.apply(ControlAction::Seek(0.0))?;
    engine.apply(ControlAction::PlayPause)?;
    for _ in 0..30 {
        engine.tick(1.0 / 30.0);
    }
    engine.apply(ControlAction::PlayPause)?;

    let history = engine.history_state();
    tracing::info!(
        "Stopped at {:.2}s, {} history entries, undo: {:?}",
        engine.clock().time(),
        history.history_size,
        history.undo_description
    );

    let tracks: Vec<_> = engine.timeline().tracks().collect();
    println!("{}", serde_json::to_string_pretty(&tracks)?);
    Ok(())
}
