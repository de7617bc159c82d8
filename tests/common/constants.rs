#![allow(dead_code)]

//! Names used by the sample project.

pub const ACTOR_NAME: &str = "Narrator";
pub const ACTOR_BASE_FILENAME: &str = "narrator";
pub const SCENE_NAME: &str = "Act1";

pub const SCENE_BIN_NAME: &str = "Lines";
pub const GREETING_NAME: &str = "Greeting";
pub const GREETING_TAKES: usize = 2;

pub const ACTOR_BIN_NAME: &str = "Barks";
pub const GRUNT_NAME: &str = "Grunt";

pub const GLOBAL_BIN_NAME: &str = "Themes";
pub const THEME_NAME: &str = "Main Theme";
