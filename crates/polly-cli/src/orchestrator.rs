use crate::agent::AgentConnector;
use crate::console::Console;
use crate::driver::{DriverSettings, PhaseDriver, PhaseReport, PhaseRequest};
use crate::input::{Prompter, UserInput};
use crate::root::canonical_root;
use anyhow::Result;
use chrono::Local;
use polly_core::completion::{list_incomplete, resume_phase, FeatureArtifacts};
use polly_core::config::PollyConfig;
use polly_core::future_features::{list_stubs, read_stub, stub_format_guide, stub_title};
use polly_core::increments::{ordering_warnings, parse_increments, Increment};
use polly_core::instructions::{build_instruction, InstructionContext};
use polly_core::machine::is_exit_keyword;
use polly_core::paths::{prompt_file_index, ProjectLayout};
use polly_core::phase::Phase;
use polly_core::skills::{format_skills_metadata, load_skill_metadata};
use polly_core::PollyError;
use std::path::{Path, PathBuf};

pub const MENU_OPTIONS: [&str; 5] = [
    "Discover many features",
    "Define a new feature",
    "Expand a future-feature stub",
    "Continue an existing feature",
    "Exit",
];

const CONTEXT_QUESTION: &str = "I'll start by reviewing the feature documentation already in this project. Press Enter to begin, or tell me anything I should know first.";
const CONTEXT_DEFAULT: &str = "Please review the existing feature documentation and summarize it.";
const DISCOVERY_QUESTION: &str =
    "What feature would you like to define? A sentence or two is enough to start.";
const SEED_QUESTION: &str =
    "Let's expand this future feature. Press Enter to start, or add anything you already know.";
const SEED_DEFAULT: &str = "Let's expand this future-feature stub into a full feature definition.";
const GROUPING_QUESTION: &str =
    "Next we'll break the feature into increments. Press Enter and I'll propose a first cut.";
const GROUPING_DEFAULT: &str = "Please read the feature summary and propose increments.";
const GENERATION_QUESTION: &str =
    "Now I'll write a coding prompt for each increment. Press Enter to start.";
const GENERATION_DEFAULT: &str = "Please generate the coding prompts.";
const IDENTIFY_QUESTION: &str =
    "Describe the application you want to build, and I'll help identify its features.";
const COORDINATOR_QUESTION: &str = "What would you like to work on?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    DiscoverMany,
    DefineNew,
    ExpandStub,
    ContinueExisting,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuChoice::DiscoverMany),
            "2" => Some(MenuChoice::DefineNew),
            "3" => Some(MenuChoice::ExpandStub),
            "4" => Some(MenuChoice::ContinueExisting),
            "5" => Some(MenuChoice::Exit),
            _ => None,
        }
    }
}

/// Sequences phases for a whole session.
///
/// Context gathering runs once; its transcript, together with every
/// future-feature stub captured so far, is fed into each later phase.
pub struct Orchestrator {
    console: Console,
    prompter: Box<dyn Prompter>,
    connector: Box<dyn AgentConnector>,
    config: PollyConfig,
    settings: DriverSettings,
    layout: ProjectLayout,
    project_context: String,
    captured: Vec<PathBuf>,
}

impl Orchestrator {
    pub fn new(
        root: PathBuf,
        config: PollyConfig,
        console: Console,
        prompter: Box<dyn Prompter>,
        connector: Box<dyn AgentConnector>,
    ) -> Self {
        let settings = DriverSettings::from_config(&config);
        Self {
            console,
            prompter,
            connector,
            config,
            settings,
            layout: ProjectLayout::new(root),
            project_context: String::new(),
            captured: Vec::new(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.console.welcome();
        if !self.choose_project().await? {
            self.console.success("Goodbye!");
            return Ok(());
        }
        self.gather_context().await?;

        loop {
            let choice = self.menu().await?;
            tracing::debug!(?choice, "menu choice");
            match choice {
                MenuChoice::DiscoverMany => self.discover_many().await?,
                MenuChoice::DefineNew => self.define_feature(None).await?,
                MenuChoice::ExpandStub => self.expand_stub().await?,
                MenuChoice::ContinueExisting => self.continue_existing().await?,
                MenuChoice::Exit => break,
            }
        }
        self.console.success("Goodbye!");
        Ok(())
    }

    /// A single open-ended session driven by skill metadata instead of the
    /// fixed phases. Ends when the user exits.
    pub async fn run_coordinator(&mut self) -> Result<()> {
        self.console.welcome();
        let skills_dir = self.config.skills_dir(&self.layout.root);
        let skills = load_skill_metadata(&skills_dir);
        tracing::info!(count = skills.len(), dir = %skills_dir.display(), "loaded skills");
        let metadata = format_skills_metadata(&skills);
        let directory = skills_dir.display().to_string();
        let instruction = build_instruction(
            Phase::Coordinator,
            &self.layout,
            &InstructionContext {
                skills_metadata: Some(&metadata),
                skills_directory: Some(&directory),
                ..Default::default()
            },
        )?;
        self.run_phase(Phase::Coordinator, instruction, COORDINATOR_QUESTION, None)
            .await?;
        self.console.success("Goodbye!");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Input helpers
    // -----------------------------------------------------------------------

    /// Read one answer. `None` means the user asked to leave.
    async fn ask(&mut self, label: &str) -> Result<Option<String>> {
        loop {
            self.console.prompt(label);
            match self.prompter.read_line().await? {
                UserInput::Line(l) if is_exit_keyword(&l) => return Ok(None),
                UserInput::Line(l) => return Ok(Some(l.trim().to_string())),
                UserInput::Interrupted => self.console.blank(),
                UserInput::Eof => {
                    self.console.blank();
                    return Ok(None);
                }
            }
        }
    }

    /// Pick one of `count` listed entries, returning its index.
    async fn choose(&mut self, count: usize) -> Result<Option<usize>> {
        loop {
            let Some(answer) = self.ask(&format!("Choose a number [1-{count}]: ")).await? else {
                return Ok(None);
            };
            match answer.parse::<usize>() {
                Ok(n) if (1..=count).contains(&n) => return Ok(Some(n - 1)),
                _ => self
                    .console
                    .warning(&format!("Please enter a number from 1 to {count}.")),
            }
        }
    }

    async fn menu(&mut self) -> Result<MenuChoice> {
        loop {
            self.console.menu(&MENU_OPTIONS);
            let Some(answer) = self.ask("Choose an option [1-5]: ").await? else {
                return Ok(MenuChoice::Exit);
            };
            if answer.is_empty() {
                continue;
            }
            match MenuChoice::parse(&answer) {
                Some(choice) => return Ok(choice),
                None => self.console.warning("Please enter a number from 1 to 5."),
            }
        }
    }

    async fn choose_project(&mut self) -> Result<bool> {
        let default = self.layout.root.clone();
        loop {
            let label = format!("Project directory [{}]: ", default.display());
            let Some(answer) = self.ask(&label).await? else {
                return Ok(false);
            };
            let dir = if answer.is_empty() {
                default.clone()
            } else {
                self.layout.resolve(Path::new(&answer))
            };
            if dir.is_dir() {
                let dir = canonical_root(&dir);
                tracing::info!(root = %dir.display(), "project selected");
                self.layout = ProjectLayout::new(dir);
                self.console
                    .info(&format!("Working in {}", self.layout.root.display()));
                return Ok(true);
            }
            self.console
                .error(&format!("{} is not a directory.", dir.display()));
        }
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    async fn run_phase(
        &mut self,
        phase: Phase,
        instruction: String,
        question: &str,
        default_input: Option<&str>,
    ) -> Result<PhaseReport> {
        let req = PhaseRequest {
            phase,
            instruction,
            question: question.to_string(),
            default_input: default_input.map(str::to_string),
        };
        let report = PhaseDriver {
            console: &mut self.console,
            prompter: self.prompter.as_mut(),
            connector: self.connector.as_ref(),
            settings: &self.settings,
        }
        .run(&self.layout, req)
        .await?;

        let new: Vec<PathBuf> = report
            .future_features
            .iter()
            .filter(|p| !self.captured.contains(p))
            .cloned()
            .collect();
        self.console.captured_features(&new);
        self.captured.extend(new);
        Ok(report)
    }

    fn context(&self) -> InstructionContext<'_> {
        InstructionContext {
            project_context: Some(&self.project_context),
            future_features: &self.captured,
            ..Default::default()
        }
    }

    async fn gather_context(&mut self) -> Result<()> {
        let instruction =
            build_instruction(Phase::ContextGathering, &self.layout, &self.context())?;
        let report = self
            .run_phase(
                Phase::ContextGathering,
                instruction,
                CONTEXT_QUESTION,
                Some(CONTEXT_DEFAULT),
            )
            .await?;
        self.project_context = report.transcript;
        Ok(())
    }

    async fn discover_many(&mut self) -> Result<()> {
        let stub_format = stub_format_guide(Local::now())?;
        let instruction = build_instruction(
            Phase::Identification,
            &self.layout,
            &InstructionContext {
                stub_format: Some(&stub_format),
                ..self.context()
            },
        )?;
        let report = self
            .run_phase(Phase::Identification, instruction, IDENTIFY_QUESTION, None)
            .await?;
        if !report.is_complete() {
            return Ok(());
        }
        match report.future_features.len() {
            0 => self.console.info("No stubs were written."),
            n => self.console.success(&format!(
                "{n} stub(s) ready. Choose 'Expand a future-feature stub' to define one."
            )),
        }
        Ok(())
    }

    /// Discovery, then the rest of the pipeline. `seed` is a stub's full
    /// text when expanding one.
    async fn define_feature(&mut self, seed: Option<String>) -> Result<()> {
        let stub_format = stub_format_guide(Local::now())?;
        let instruction = build_instruction(
            Phase::Discovery,
            &self.layout,
            &InstructionContext {
                seed: seed.as_deref(),
                stub_format: Some(&stub_format),
                ..self.context()
            },
        )?;
        let (question, default) = match seed {
            Some(_) => (SEED_QUESTION, Some(SEED_DEFAULT)),
            None => (DISCOVERY_QUESTION, None),
        };
        let report = self
            .run_phase(Phase::Discovery, instruction, question, default)
            .await?;
        if !report.is_complete() {
            return Ok(());
        }

        let Some(slug) = report.summary_slug else {
            let err = PollyError::MissingPrerequisite {
                artifact: "feature summary".to_string(),
                phase: Phase::Grouping.to_string(),
            };
            self.console.error(&format!(
                "{err}. Discovery finished without writing a summary under {}.",
                self.layout.features.display()
            ));
            return Ok(());
        };
        self.console.success(&format!(
            "Feature summary saved: {}",
            self.layout.summary_path(&slug).display()
        ));
        self.finish_feature(&slug, Phase::Grouping).await
    }

    async fn expand_stub(&mut self) -> Result<()> {
        let stubs = list_stubs(&self.layout.future_features)?;
        if stubs.is_empty() {
            self.console.info(&format!(
                "No future-feature stubs found in {}.",
                self.layout.future_features.display()
            ));
            return Ok(());
        }
        let rows: Vec<Vec<String>> = stubs
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let title = read_stub(s)
                    .ok()
                    .and_then(|c| stub_title(&c).map(str::to_string))
                    .unwrap_or_default();
                vec![(i + 1).to_string(), s.slug.clone(), title]
            })
            .collect();
        self.console.table(&["#", "Stub", "Title"], &rows);

        let Some(idx) = self.choose(stubs.len()).await? else {
            return Ok(());
        };
        let seed = match read_stub(&stubs[idx]) {
            Ok(s) => s,
            Err(e) => {
                self.console.error(&format!(
                    "could not read {}: {e}",
                    stubs[idx].path.display()
                ));
                return Ok(());
            }
        };
        tracing::info!(stub = %stubs[idx].slug, "expanding stub");
        self.define_feature(Some(seed)).await
    }

    async fn continue_existing(&mut self) -> Result<()> {
        let incomplete = list_incomplete(&self.layout.features)?;
        if incomplete.is_empty() {
            self.console.info("No incomplete features found.");
            return Ok(());
        }
        let rows: Vec<Vec<String>> = incomplete
            .iter()
            .enumerate()
            .map(|(i, f)| vec![(i + 1).to_string(), f.slug.clone(), f.status.to_string()])
            .collect();
        self.console.table(&["#", "Feature", "Status"], &rows);

        let Some(idx) = self.choose(incomplete.len()).await? else {
            return Ok(());
        };
        let slug = incomplete[idx].slug.clone();
        let phase = resume_phase(&self.layout.features, &slug);
        if phase == Phase::Discovery {
            return self.define_feature(None).await;
        }
        self.console
            .info(&format!("Resuming {slug} at {}.", phase.heading()));
        self.finish_feature(&slug, phase).await
    }

    /// Run the pipeline for `slug` from `start` through prompt generation.
    async fn finish_feature(&mut self, slug: &str, start: Phase) -> Result<()> {
        for &phase in Phase::pipeline().iter().filter(|p| **p >= start) {
            if let Err(e) = self.check_prerequisites(slug, phase) {
                self.console.error(&e.to_string());
                return Ok(());
            }
            let increments = if phase == Phase::Generation {
                self.load_increments(slug)?
            } else {
                Vec::new()
            };
            let (question, default) = match phase {
                Phase::Grouping => (GROUPING_QUESTION, GROUPING_DEFAULT),
                _ => (GENERATION_QUESTION, GENERATION_DEFAULT),
            };
            let stub_format = stub_format_guide(Local::now())?;
            let instruction = build_instruction(
                phase,
                &self.layout,
                &InstructionContext {
                    feature_slug: Some(slug),
                    increments: &increments,
                    stub_format: Some(&stub_format),
                    ..self.context()
                },
            )?;
            let report = self
                .run_phase(phase, instruction, question, Some(default))
                .await?;
            if !report.is_complete() {
                return Ok(());
            }
        }
        self.report_feature(slug)
    }

    fn check_prerequisites(&self, slug: &str, phase: Phase) -> polly_core::Result<()> {
        let mut required = vec![self.layout.summary_path(slug)];
        if phase >= Phase::Generation {
            required.push(self.layout.increments_path(slug));
        }
        match required.into_iter().find(|p| !p.is_file()) {
            Some(missing) => Err(PollyError::MissingPrerequisite {
                artifact: missing.display().to_string(),
                phase: phase.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn load_increments(&mut self, slug: &str) -> Result<Vec<Increment>> {
        let path = self.layout.increments_path(slug);
        let text = std::fs::read_to_string(&path)?;
        let increments = parse_increments(&text);
        if increments.is_empty() {
            tracing::warn!(path = %path.display(), "no increments parsed");
            self.console.warning(&format!(
                "No '## Increment N: Name' headings found in {}; prompt files will be named by the agent.",
                path.display()
            ));
        }
        for w in ordering_warnings(&increments) {
            self.console.warning(&w);
        }
        Ok(increments)
    }

    fn report_feature(&mut self, slug: &str) -> Result<()> {
        let artifacts = FeatureArtifacts::inspect(&self.layout, slug)?;
        let show = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "missing".to_string())
        };
        let extra = format!(
            "Summary: {}\nIncrements: {}\nPrompts: {} file(s) in {}",
            show(&artifacts.summary),
            show(&artifacts.increments),
            artifacts.prompts.len(),
            self.layout.feature_prompts_dir(slug).display()
        );
        self.console
            .phase_complete(&format!("Feature '{slug}'"), Some(&extra));

        if let Some(path) = &artifacts.increments {
            let text = std::fs::read_to_string(path)?;
            let present: Vec<u32> = artifacts
                .prompts
                .iter()
                .filter_map(|p| p.file_name()?.to_str())
                .filter_map(prompt_file_index)
                .collect();
            for inc in parse_increments(&text) {
                if !present.contains(&inc.number) {
                    self.console.warning(&format!(
                        "No prompt file for Increment {}: {} (expected {})",
                        inc.number,
                        inc.name,
                        inc.prompt_filename()
                    ));
                }
            }
        }
        if !artifacts.is_complete() {
            self.console.warning(&format!(
                "Feature '{slug}' is still missing artifacts; choose 'Continue an existing feature' to resume it."
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
