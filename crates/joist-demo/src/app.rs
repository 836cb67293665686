#![forbid(unsafe_code)]

//! Boot sequence and stepping for the ramp simulation.
//!
//! [`DemoApp::launch`] runs the whole startup path: parse launch parameters,
//! select screens, build the locale state, register strings and plugins,
//! then open the description startup gate. [`Step`]s drive the running sim
//! and [`DemoApp::report`] captures what a screen reader would see.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use joist_core::{
    QueryError, QueryParameters, ScreenParameters, ScreenSelectionError, select_screens,
};
use joist_runtime::{
    AccessibleNode, DescriptionError, DescriptionLogic, DescriptionRegistry, DescriptionService,
    Direction, Locale, LocaleData, LocaleError, LocaleState, NavigationError, Navigator,
    NodeHandle,
};
use serde::Serialize;
use thiserror::Error;

use crate::sim::{
    BALL_TANDEM, BUNDLED_STRINGS, FULL_PLUGIN, RampDescription, RampModel, SELECTED_SCREEN_TANDEM,
    ScreenId, SimNodes, TERSE_PLUGIN, TerseDescription,
};

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("invalid launch query: {0}")]
    Query(#[from] QueryError),

    #[error("invalid screen selection: {0}")]
    Screens(#[from] ScreenSelectionError),

    #[error("invalid locale data: {0}")]
    Locale(#[from] LocaleError),

    #[error(transparent)]
    Description(#[from] DescriptionError),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error("unrecognized step {0:?}")]
    InvalidStep(String),
}

/// Everything needed to boot the simulation.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Launch query string, e.g. `?screens=2,1&locale=es`.
    pub query: String,
    /// Locale table JSON. `None` uses the built-in table.
    pub locale_data: Option<String>,
    /// Description plugin to load at startup.
    pub plugin: String,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            query: String::new(),
            locale_data: None,
            plugin: FULL_PLUGIN.to_string(),
        }
    }
}

/// A command applied to the running simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Next,
    Prev,
    Home,
    /// Select a screen by 1-based index into the simulation screens.
    Screen(usize),
    Locale(String),
    Fallbacks(Vec<String>),
    Plugin(String),
    Height(f64),
    Friction(bool),
    Release,
}

impl FromStr for Step {
    type Err = DemoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DemoError::InvalidStep(s.to_string());
        let (command, arg) = match s.trim().split_once('=') {
            Some((c, a)) => (c, Some(a.trim())),
            None => (s.trim(), None),
        };
        match (command, arg) {
            ("next", None) => Ok(Self::Next),
            ("prev", None) => Ok(Self::Prev),
            ("home", None) => Ok(Self::Home),
            ("release", None) => Ok(Self::Release),
            ("screen", Some(n)) => n.parse().map(Self::Screen).map_err(|_| invalid()),
            ("locale", Some(l)) if !l.is_empty() => Ok(Self::Locale(l.to_string())),
            ("fallbacks", Some(list)) => Ok(Self::Fallbacks(
                list.split(',')
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            ("plugin", Some(p)) if !p.is_empty() => Ok(Self::Plugin(p.to_string())),
            ("height", Some(h)) => h.parse().map(Self::Height).map_err(|_| invalid()),
            ("friction", Some(f)) => match f {
                "on" | "true" => Ok(Self::Friction(true)),
                "off" | "false" => Ok(Self::Friction(false)),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Next => write!(f, "next"),
            Self::Prev => write!(f, "prev"),
            Self::Home => write!(f, "home"),
            Self::Release => write!(f, "release"),
            Self::Screen(n) => write!(f, "screen={n}"),
            Self::Locale(l) => write!(f, "locale={l}"),
            Self::Fallbacks(list) => write!(f, "fallbacks={}", list.join(",")),
            Self::Plugin(p) => write!(f, "plugin={p}"),
            Self::Height(h) => write!(f, "height={h}"),
            Self::Friction(on) => write!(f, "friction={}", if *on { "on" } else { "off" }),
        }
    }
}

/// Accessible content of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voicing: Option<String>,
}

impl NodeReport {
    fn of(node: &NodeHandle<AccessibleNode>) -> Self {
        let node = node.borrow();
        Self {
            name: node.accessible_name.clone(),
            description: node.description.clone(),
            help_text: node.help_text.clone(),
            voicing: node.voicing_name_response.clone(),
        }
    }
}

/// Snapshot of the running simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub screen: ScreenId,
    pub home_selected: bool,
    pub screens: Vec<ScreenId>,
    pub locale: Locale,
    pub locale_order: Vec<Locale>,
    pub direction: Direction,
    pub active_context: Option<u64>,
    pub screen_node: Option<NodeReport>,
    pub ball: NodeReport,
    pub announcer: NodeReport,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
}

/// The booted simulation.
pub struct DemoApp {
    locale: LocaleState,
    navigator: Navigator<ScreenId>,
    description: DescriptionService,
    model: Rc<RampModel>,
    nodes: Rc<SimNodes>,
}

impl fmt::Debug for DemoApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DemoApp")
            .field("screen", &self.navigator.selected())
            .field("locale", &self.locale.locale())
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl DemoApp {
    /// Boot the simulation. Any configuration error aborts the launch.
    pub fn launch(config: &LaunchConfig) -> Result<Self, DemoError> {
        let query = QueryParameters::parse(&config.query)?;
        let selection = select_screens(
            ScreenId::SIM_SCREENS,
            &ScreenParameters::from(&query),
            |_| ScreenId::Home,
        )?;
        tracing::info!(
            screens = ?selection.screens,
            initial = ?selection.initial_screen,
            "screens selected"
        );
        let navigator = Navigator::new(selection);

        let data = match &config.locale_data {
            Some(json) => LocaleData::from_json(json)?,
            None => LocaleData::builtin(),
        };
        let locale = LocaleState::from_query(data, &query);

        let model = Rc::new(RampModel::new());
        let nodes = Rc::new(SimNodes::new());
        let registry = DescriptionRegistry::new();
        registry.add(BALL_TANDEM, Rc::new(model.height.clone()));
        registry.add(
            SELECTED_SCREEN_TANDEM,
            Rc::new(navigator.selected_property().clone()),
        );

        let description = DescriptionService::new(locale.order().clone(), registry.clone());
        for (code, json) in BUNDLED_STRINGS {
            description.register_strings_json(*code, json)?;
        }
        {
            let (model, nodes, registry) = (Rc::clone(&model), Rc::clone(&nodes), registry);
            description.register_plugin(FULL_PLUGIN, move || {
                Rc::new(RampDescription::new(
                    Rc::clone(&model),
                    Rc::clone(&nodes),
                    registry.clone(),
                )) as Rc<dyn DescriptionLogic>
            });
        }
        {
            let nodes = Rc::clone(&nodes);
            description.register_plugin(TERSE_PLUGIN, move || {
                Rc::new(TerseDescription::new(Rc::clone(&nodes))) as Rc<dyn DescriptionLogic>
            });
        }
        description.load_plugin(&config.plugin)?;
        description.startup_complete();

        Ok(Self {
            locale,
            navigator,
            description,
            model,
            nodes,
        })
    }

    pub fn apply(&self, step: &Step) -> Result<(), DemoError> {
        tracing::debug!(%step, "applying step");
        match step {
            Step::Next => {
                self.navigator.next();
            }
            Step::Prev => {
                self.navigator.prev();
            }
            Step::Home => self.navigator.go_home()?,
            Step::Screen(n) => {
                let screen = n
                    .checked_sub(1)
                    .and_then(|i| ScreenId::SIM_SCREENS.get(i))
                    .ok_or(NavigationError::UnknownScreen)?;
                self.navigator.select(screen)?;
            }
            Step::Locale(requested) => {
                let resolved = self.locale.set_locale(requested);
                if &resolved != requested {
                    tracing::info!(requested = %requested, resolved = %resolved, "locale resolved");
                }
            }
            Step::Fallbacks(list) => self.locale.set_fallback_locales(list.clone()),
            Step::Plugin(name) => self.description.load_plugin(name)?,
            Step::Height(h) => self.model.set_height(*h),
            Step::Friction(on) => {
                self.model.friction.set(*on);
            }
            Step::Release => self.model.released.emit(&()),
        }
        Ok(())
    }

    #[must_use]
    pub fn report(&self) -> Report {
        let screen = self.navigator.selected();
        Report {
            screen,
            home_selected: self.navigator.is_home_selected(),
            screens: self.navigator.selection().screens.clone(),
            locale: self.locale.locale(),
            locale_order: self.locale.locale_order(),
            direction: self.locale.direction(),
            active_context: self.description.active_context_property().get(),
            screen_node: self.nodes.screen(screen).map(NodeReport::of),
            ball: NodeReport::of(&self.nodes.ball),
            announcer: NodeReport::of(&self.nodes.announcer),
            status: self.model.status.get(),
        }
    }

    #[must_use]
    pub fn navigator(&self) -> &Navigator<ScreenId> {
        &self.navigator
    }

    #[must_use]
    pub fn locale(&self) -> &LocaleState {
        &self.locale
    }

    #[must_use]
    pub fn description(&self) -> &DescriptionService {
        &self.description
    }

    #[must_use]
    pub fn model(&self) -> &RampModel {
        &self.model
    }
}
