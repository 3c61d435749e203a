//! RON configuration loader
//!
//! Documents are compiled into [`Definitions`] one entry at a time. A bad
//! entry is logged, recorded in the [`LoadReport`] and skipped; only I/O and
//! RON syntax errors abort a load.

use crate::error::{Error, Result};
use crate::schema::{CommunicationNode, ConfigNode, Document, VariationNode};
use parley_core::{
    ChannelRegistry, CommConfig, CommunicationDef, Condition, Definitions, PlaybackBackend,
    Scheduler, Variation, VariableDeclarations, MAX_VARIATION_COUNT,
};
use ron::extensions::Extensions;
use std::fs;
use std::path::{Path, PathBuf};

/// Entries skipped while loading
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Documents parsed successfully
    pub documents: usize,
    pub errors: Vec<Error>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Loader for RON configuration documents
pub struct Loader {
    defs: Definitions,
    /// Scratch registry used to validate channel entries across documents
    channels: ChannelRegistry,
    report: LoadReport,
    /// Skipped by directory scans
    main: Option<PathBuf>,
}

impl Loader {
    /// Create a new loader
    pub fn new() -> Self {
        Self {
            defs: Definitions::new(),
            channels: ChannelRegistry::new(),
            report: LoadReport::default(),
            main: None,
        }
    }

    /// Parse a document without compiling it
    pub fn parse(content: &str) -> Result<Document> {
        let options = ron::Options::default().with_default_extension(Extensions::IMPLICIT_SOME);
        Ok(options.from_str(content)?)
    }

    /// Load one document from a RON string
    pub fn load_str(&mut self, content: &str) -> Result<()> {
        let document = Self::parse(content)?;
        self.load_document(document);
        Ok(())
    }

    /// Compile an already parsed document
    pub fn load_document(&mut self, document: Document) {
        self.report.documents += 1;

        if document.is_empty() {
            self.reject("document", Error::InvalidDocument("no definitions".to_string()));
            return;
        }

        // Variables first so conditions in the same document can see them
        for decl in document.variables {
            if let Err(err) = self.defs.variables.declare(decl) {
                self.reject("variable", err.into());
            }
        }

        for node in document.channels {
            match self.channels.load_channel_definition(&node, None) {
                Ok(_) => self.defs.channels.push(node),
                Err(err) => self.reject("channel", err.into()),
            }
        }

        for node in &document.configs {
            self.load_config(node);
        }

        if let Some(audio) = document.global {
            if self.defs.audio.is_some() {
                tracing::debug!("audio routing overridden");
            }
            self.defs.audio = Some(audio);
        }
    }

    /// Load a single RON file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        self.load_str(&content).inspect_err(|err| {
            tracing::warn!(path = %path.display(), error = %err, "failed to load configuration file");
        })
    }

    /// Load all RON files from a directory, recursively
    ///
    /// Entries are visited in name order. The main configuration file is
    /// skipped since it has already been loaded.
    pub fn load_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if !path.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Not a directory: {:?}", path),
            )));
        }

        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();

        for file_path in entries {
            if file_path.is_dir() {
                self.load_directory(&file_path)?;
            } else if file_path.extension().is_some_and(|e| e == "ron") {
                if self.is_main(&file_path) {
                    continue;
                }
                self.load_file(&file_path)?;
            }
        }

        Ok(())
    }

    /// Load the main file, then every other document under `root`
    pub fn load_configuration(
        &mut self,
        main: impl AsRef<Path>,
        root: impl AsRef<Path>,
    ) -> Result<()> {
        let main = main.as_ref();
        self.load_file(main)?;
        self.main = Some(canonical(main));
        self.load_directory(root)
    }

    /// Finish loading and return the definitions
    pub fn finish(self) -> Definitions {
        self.defs
    }

    /// Finish loading and return the definitions with the report
    pub fn into_parts(self) -> (Definitions, LoadReport) {
        (self.defs, self.report)
    }

    /// Replace the scheduler's definitions with everything loaded so far
    pub fn apply<B: PlaybackBackend>(self, scheduler: &mut Scheduler<B>) -> LoadReport {
        let (defs, mut report) = self.into_parts();
        report
            .errors
            .extend(scheduler.reload(defs).into_iter().map(Error::Core));
        report
    }

    /// Get the current definitions (for inspection during loading)
    pub fn defs(&self) -> &Definitions {
        &self.defs
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    fn is_main(&self, path: &Path) -> bool {
        self.main.as_deref().is_some_and(|main| main == canonical(path))
    }

    fn load_config(&mut self, node: &ConfigNode) {
        let Some(name) = node.name.as_deref().filter(|n| !n.trim().is_empty()) else {
            self.reject("config", parley_core::Error::MissingName("config").into());
            return;
        };

        let mut config = CommConfig::new(name);
        for comm in &node.communications {
            let result = compile_communication(comm, &self.defs.variables)
                .and_then(|def| config.insert(def));
            if let Err(err) = result {
                tracing::warn!(config = name, error = %err, "skipping communication");
                self.report.errors.push(err.into());
            }
        }

        if let Err(err) = self.defs.library.insert(config) {
            self.reject("config", err.into());
        }
    }

    fn reject(&mut self, kind: &'static str, err: Error) {
        tracing::warn!(kind, error = %err, "skipping definition");
        self.report.errors.push(err);
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Load a main file plus a directory and reload a scheduler with the result
pub fn reload<B: PlaybackBackend>(
    scheduler: &mut Scheduler<B>,
    main: impl AsRef<Path>,
    root: impl AsRef<Path>,
) -> Result<LoadReport> {
    let mut loader = Loader::new();
    loader.load_configuration(main, root)?;
    Ok(loader.apply(scheduler))
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn compile_communication(
    node: &CommunicationNode,
    decls: &VariableDeclarations,
) -> parley_core::Result<CommunicationDef> {
    let name = node
        .name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .ok_or(parley_core::Error::MissingName("communication"))?;

    let mut def = CommunicationDef::new(name).with_force_animation(node.force_animation);
    if let Some(method) = &node.choice_method {
        def = def.with_choice_method(method.parse()?);
    }

    let response_method = match &node.response_choice_method {
        Some(method) => method.parse()?,
        None => def.response_choice_method,
    };
    match &node.response_name {
        Some(response) => def = def.with_response(response, response_method),
        None => def.response_choice_method = response_method,
    }

    let defaults = compile_variation(&node.defaults, Variation::default(), decls)?;

    if node.variations.len() > MAX_VARIATION_COUNT {
        tracing::warn!(
            comm = name,
            count = node.variations.len(),
            "maximum number of variations reached"
        );
    }
    for variation in node.variations.iter().take(MAX_VARIATION_COUNT) {
        def.push_variation(compile_variation(variation, defaults.clone(), decls)?);
    }

    Ok(def)
}

/// Overlay a node's attributes onto an inherited variation
fn compile_variation(
    node: &VariationNode,
    mut variation: Variation,
    decls: &VariableDeclarations,
) -> parley_core::Result<Variation> {
    if let Some(name) = &node.animation_name {
        variation.animation_name = Some(name.clone());
    }
    if let Some(name) = &node.sound_name {
        variation.sound_name = Some(name.clone());
    }
    if let Some(name) = &node.voice_name {
        variation.voice_name = Some(name.clone());
    }
    if let Some(look) = node.look_at_target {
        variation.look_at_target = look;
    }
    if let Some(finish) = &node.finish_method {
        variation.finish = finish.parse()?;
    }
    if let Some(blocking) = &node.blocking {
        variation.blocking = blocking.parse()?;
    }
    if let Some(method) = &node.animation_type {
        variation.animation_method = method.parse()?;
    }
    if let Some(timeout) = node.timeout {
        variation.timeout = timeout;
    }
    if let Some(condition) = &node.condition {
        variation.condition = Some(Condition::parse(condition, decls)?);
    }
    Ok(variation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{
        ActorId, AnimationMethod, BlockFlags, ChannelId, ChoiceMethod, CommId, Components,
        ConfigId, RecordingBackend, Request,
    };
    use std::io::Write;

    const SOLDIER: &str = r#"
    (
        variables: [
            (name: "Alerted"),
            (name: "Wounded", default: true),
        ],
        channels: [
            (
                name: "Global",
                min_silence: 1.0,
                flush_silence: 0.0,
                children: [
                    (name: "Idle", priority: 1),
                    (name: "Combat", priority: 5, kind: "group"),
                ],
            ),
            (name: "Personal", kind: "personal", actor_min_silence: 2.0),
        ],
        configs: [
            (
                name: "Soldier",
                communications: [
                    (
                        name: "Greeting",
                        choice_method: "sequence",
                        response_name: "Reply",
                        defaults: (voice_name: "greet_default", finish_method: "voice"),
                        variations: [
                            (),
                            (voice_name: "greet_02", condition: "Alerted && !Wounded"),
                        ],
                    ),
                    (
                        name: "Salute",
                        force_animation: true,
                        variations: [
                            (
                                animation_name: "salute",
                                animation_type: "action",
                                blocking: "movement, fire",
                                timeout: 1.5,
                                look_at_target: true,
                            ),
                        ],
                    ),
                ],
            ),
        ],
        global: (prefix_for_play_trigger: "Play_", prefix_for_stop_trigger: "Stop_"),
    )
    "#;

    fn soldier() -> Loader {
        let mut loader = Loader::new();
        loader.load_str(SOLDIER).unwrap();
        loader
    }

    #[test]
    fn test_load_document() {
        let loader = soldier();
        assert!(loader.report().is_clean());
        assert_eq!(loader.report().documents, 1);

        let defs = loader.finish();
        assert_eq!(defs.channels.len(), 2);
        assert!(defs.variables.id_of("Alerted").is_some());
        assert!(defs.variables.id_of("Wounded").is_some());
        assert_eq!(defs.audio.as_ref().unwrap().prefix_for_play_trigger, "Play_");

        let config = defs.library.config(ConfigId::from_name("Soldier")).unwrap();
        assert_eq!(config.len(), 2);
    }

    #[test]
    fn test_variation_inherits_defaults() {
        let defs = soldier().finish();
        let greeting = defs
            .library
            .communication(ConfigId::from_name("Soldier"), CommId::from_name("Greeting"))
            .unwrap();

        assert_eq!(greeting.choice_method, ChoiceMethod::Sequence);
        assert_eq!(greeting.response, Some(CommId::from_name("Reply")));
        assert_eq!(greeting.response_choice_method, ChoiceMethod::RandomSequence);
        assert_eq!(greeting.variations.len(), 2);

        let first = &greeting.variations[0];
        assert_eq!(first.voice_name.as_deref(), Some("greet_default"));
        assert_eq!(first.finish, Components::VOICE);
        assert!(first.condition.is_none());

        let second = &greeting.variations[1];
        assert_eq!(second.voice_name.as_deref(), Some("greet_02"));
        assert_eq!(second.finish, Components::VOICE);
        assert!(second.condition.is_some());
    }

    #[test]
    fn test_variation_attributes() {
        let defs = soldier().finish();
        let salute = defs
            .library
            .communication(ConfigId::from_name("Soldier"), CommId::from_name("Salute"))
            .unwrap();

        assert!(salute.force_animation);
        let variation = &salute.variations[0];
        assert_eq!(variation.animation_method, AnimationMethod::Action);
        assert!(variation.blocking.contains(BlockFlags::MOVEMENT));
        assert!(variation.blocking.contains(BlockFlags::FIRE));
        assert_eq!(variation.timeout, 1.5);
        assert!(variation.look_at_target);
        assert_eq!(variation.finish, Components::ALL);
    }

    #[test]
    fn test_bad_entries_are_skipped() {
        let content = r#"
        (
            channels: [
                (name: "Good"),
                (name: "Bad", kind: "tribal"),
                (min_silence: 1.0),
            ],
            configs: [
                (
                    name: "Pilot",
                    communications: [
                        (name: "Broken", choice_method: "shuffle", variations: [(voice_name: "a")]),
                        (name: "Unknown", variations: [(voice_name: "b", condition: "Missing")]),
                        (name: "Fine", variations: [(voice_name: "c")]),
                    ],
                ),
                (communications: []),
            ],
        )
        "#;

        let mut loader = Loader::new();
        loader.load_str(content).unwrap();
        assert_eq!(loader.report().errors.len(), 5);

        let defs = loader.finish();
        assert_eq!(defs.channels.len(), 1);
        let pilot = defs.library.config(ConfigId::from_name("Pilot")).unwrap();
        assert_eq!(pilot.len(), 1);
        assert!(pilot.get(CommId::from_name("Fine")).is_some());
    }

    #[test]
    fn test_redefinition_across_documents() {
        let mut loader = soldier();
        loader
            .load_str(r#"(channels: [(name: "global")], configs: [(name: "Soldier")])"#)
            .unwrap();

        let errors = &loader.report().errors;
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|err| matches!(
            err,
            Error::Core(parley_core::Error::Redefinition { .. })
        )));
    }

    #[test]
    fn test_variation_cap() {
        let variations = (0..MAX_VARIATION_COUNT + 3)
            .map(|i| format!("(voice_name: \"line_{i}\")"))
            .collect::<Vec<_>>()
            .join(", ");
        let content = format!(
            "(configs: [(name: \"Crowd\", communications: [(name: \"Murmur\", variations: [{variations}])])])"
        );

        let mut loader = Loader::new();
        loader.load_str(&content).unwrap();
        assert!(loader.report().is_clean());

        let defs = loader.finish();
        let murmur = defs
            .library
            .communication(ConfigId::from_name("Crowd"), CommId::from_name("Murmur"))
            .unwrap();
        assert_eq!(murmur.variations.len(), MAX_VARIATION_COUNT);
    }

    #[test]
    fn test_empty_document_reported() {
        let mut loader = Loader::new();
        loader.load_str("()").unwrap();
        assert_eq!(loader.report().documents, 1);
        assert!(matches!(
            loader.report().errors.as_slice(),
            [Error::InvalidDocument(_)]
        ));

        // Later documents still load
        loader.load_str(SOLDIER).unwrap();
        assert_eq!(loader.report().errors.len(), 1);
        assert_eq!(loader.defs().library.config_count(), 1);
    }

    #[test]
    fn test_syntax_error_aborts() {
        let mut loader = Loader::new();
        let result = loader.load_str("(channels: [(name: \"Open\"");
        assert!(matches!(result, Err(Error::Ron(_))));
        assert_eq!(loader.report().documents, 0);
    }

    #[test]
    fn test_empty_condition_rejected() {
        let mut loader = Loader::new();
        loader
            .load_str(r#"(configs: [(name: "A", communications: [(name: "B", variations: [(condition: " ")])])])"#)
            .unwrap();
        assert!(matches!(
            loader.report().errors[0],
            Error::Core(parley_core::Error::Condition(_))
        ));
    }

    #[test]
    fn test_load_configuration_skips_main() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.ron");
        fs::write(&main, SOLDIER).unwrap();

        let nested = dir.path().join("extra");
        fs::create_dir(&nested).unwrap();
        let mut extra = fs::File::create(nested.join("pilot.ron")).unwrap();
        writeln!(
            extra,
            r#"(configs: [(name: "Pilot", communications: [(name: "Mayday", variations: [(voice_name: "mayday")])])])"#
        )
        .unwrap();
        fs::write(nested.join("notes.txt"), "not a document").unwrap();

        let mut loader = Loader::new();
        loader.load_configuration(&main, dir.path()).unwrap();

        // Loading main.ron twice would report redefinitions
        assert!(loader.report().is_clean());
        assert_eq!(loader.report().documents, 2);
        assert_eq!(loader.defs().library.config_count(), 2);
    }

    #[test]
    fn test_load_directory_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = Loader::new();
        let result = loader.load_directory(dir.path().join("absent"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_reload_scheduler() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.ron");
        fs::write(&main, SOLDIER).unwrap();

        let mut scheduler = Scheduler::new(RecordingBackend::new());
        let report = reload(&mut scheduler, &main, dir.path()).unwrap();
        assert!(report.is_clean());

        assert_eq!(scheduler.channel_id("Idle"), Some(ChannelId::from_name("Idle")));
        assert!(scheduler.variable("Wounded"));
        assert_eq!(
            scheduler.backend().routing.as_ref().unwrap().prefix_for_stop_trigger,
            "Stop_"
        );

        let play_id = scheduler.play(Request::named(ActorId::new(3), "Soldier", "Greeting", "Idle"));
        assert!(play_id.is_some());
        assert_eq!(scheduler.backend().started(), vec!["greet_default"]);
    }
}
