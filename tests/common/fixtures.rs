#![allow(dead_code)]

//! Sample project builder.
//!
//! The sample holds:
//! - actor "Narrator", cast in scene "Act1"
//! - scene bin "Lines" (dialogue) → media "Greeting" → 2 takes
//! - actor bin "Barks" (dialogue) → media "Grunt" → 1 take
//! - global bin "Themes" (music) → media "Main Theme", linked to "Act1"

use std::fs;

use takebin::catalog_store::{
    Actor, Bin, JournalSettings, Media, MediaType, OwnerRef, ProjectContext, ProjectPaths, Record,
    Scene, Take, TakeDraft,
};
use takebin::history::HistoryController;
use tempfile::TempDir;

use super::constants::*;

pub struct TestProject {
    _dir: TempDir,
    pub controller: HistoryController,
}

pub struct Sample {
    pub actor: Actor,
    pub scene: Scene,
    pub scene_bin: Bin,
    pub greeting: Media,
    pub greeting_takes: Vec<Take>,
    pub actor_bin: Bin,
    pub grunt: Media,
    pub grunt_take: Take,
    pub global_bin: Bin,
    pub theme: Media,
}

impl TestProject {
    pub fn new() -> Self {
        Self::with_settings(JournalSettings::default())
    }

    pub fn with_settings(settings: JournalSettings) -> Self {
        let dir = TempDir::new().unwrap();
        let ctx = ProjectContext::open(dir.path().join("project"), settings).unwrap();
        let controller = HistoryController::open(ctx).unwrap();
        TestProject {
            _dir: dir,
            controller,
        }
    }

    pub fn paths(&self) -> &ProjectPaths {
        self.controller.context().paths()
    }

    /// Raw bytes of the five record files, root-to-leaf.
    pub fn record_files(&self) -> Vec<Vec<u8>> {
        let paths = self.paths();
        [&paths.actors, &paths.scenes, &paths.bins, &paths.media, &paths.takes]
            .into_iter()
            .map(|p| fs::read(p).unwrap())
            .collect()
    }

    /// Raw bytes of every project file, journal and history included.
    pub fn all_files(&self) -> Vec<Vec<u8>> {
        self.paths()
            .all_files()
            .into_iter()
            .map(|p| fs::read(p).unwrap())
            .collect()
    }

    pub fn create(&self, record: Record) {
        let outcome = self.controller.create(record).unwrap();
        assert!(outcome.success, "{}", outcome.message);
    }

    pub fn take(&self, media: &Media, filename: &str) -> Take {
        let (_, take) = self
            .controller
            .generate_take(&media.id, TakeDraft::new(filename))
            .unwrap();
        take
    }

    pub fn seed_sample(&self) -> Sample {
        let actor = Actor::new(ACTOR_NAME, ACTOR_BASE_FILENAME);
        self.create(Record::Actor(actor.clone()));

        let mut scene = Scene::new(SCENE_NAME);
        scene.actor_ids.push(actor.id.clone());
        self.create(Record::Scene(scene.clone()));

        let scene_bin = Bin::new(OwnerRef::scene(&scene.id), MediaType::Dialogue, SCENE_BIN_NAME);
        self.create(Record::Bin(scene_bin.clone()));
        let greeting = Media::new(&scene_bin, GREETING_NAME);
        self.create(Record::Media(greeting.clone()));
        let greeting_takes: Vec<Take> = (1..=GREETING_TAKES)
            .map(|n| self.take(&greeting, &format!("greeting_{:03}.wav", n)))
            .collect();

        let actor_bin = Bin::new(OwnerRef::actor(&actor.id), MediaType::Dialogue, ACTOR_BIN_NAME);
        self.create(Record::Bin(actor_bin.clone()));
        let grunt = Media::new(&actor_bin, GRUNT_NAME);
        self.create(Record::Media(grunt.clone()));
        let grunt_take = self.take(&grunt, "grunt_001.wav");

        let global_bin = Bin::new(OwnerRef::global(), MediaType::Music, GLOBAL_BIN_NAME);
        self.create(Record::Bin(global_bin.clone()));
        let mut theme = Media::new(&global_bin, THEME_NAME);
        theme.scene_id = Some(scene.id.clone());
        self.create(Record::Media(theme.clone()));

        Sample {
            actor,
            scene,
            scene_bin,
            greeting,
            greeting_takes,
            actor_bin,
            grunt,
            grunt_take,
            global_bin,
            theme,
        }
    }
}
