#![forbid(unsafe_code)]

//! The ramp simulation: screens, model, scene nodes, strings and the
//! description plugins that voice it.

use std::rc::Rc;

use joist_runtime::{
    AccessibleNode, DescriptionContext, DescriptionError, DescriptionLogic, DescriptionRegistry,
    DescriptionStrings, Emitter, NodeHandle, Observable, RegistryObject,
};
use serde::Serialize;

/// Screens of the simulation. `Home` exists only when selected screens
/// call for a home screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenId {
    Home,
    Ramp,
    Friction,
    Energy,
}

impl ScreenId {
    /// Simulation screens in declaration order. `screens=N` indexes this.
    pub const SIM_SCREENS: &[ScreenId] = &[Self::Ramp, Self::Friction, Self::Energy];

    /// Key of this screen in the description strings.
    pub fn key(self) -> &'static str {
        screen_meta(self).key
    }

    pub fn title(self) -> &'static str {
        screen_meta(self).title
    }
}

/// Static metadata for a screen.
pub struct ScreenMeta {
    pub id: ScreenId,
    pub key: &'static str,
    pub title: &'static str,
    pub blurb: &'static str,
}

pub const SCREEN_REGISTRY: &[ScreenMeta] = &[
    ScreenMeta {
        id: ScreenId::Home,
        key: "home",
        title: "Home",
        blurb: "Pick a screen.",
    },
    ScreenMeta {
        id: ScreenId::Ramp,
        key: "ramp",
        title: "Ramp",
        blurb: "Raise and lower the ramp, then release the ball.",
    },
    ScreenMeta {
        id: ScreenId::Friction,
        key: "friction",
        title: "Friction",
        blurb: "Compare the roll with and without friction.",
    },
    ScreenMeta {
        id: ScreenId::Energy,
        key: "energy",
        title: "Energy",
        blurb: "Track potential and kinetic energy during the roll.",
    },
];

fn screen_meta(id: ScreenId) -> &'static ScreenMeta {
    SCREEN_REGISTRY
        .iter()
        .find(|meta| meta.id == id)
        .unwrap_or(&SCREEN_REGISTRY[0])
}

// ---------------------------------------------------------------------------
// Model and nodes
// ---------------------------------------------------------------------------

pub const BALL_TANDEM: &str = "ramp.model.ball";
pub const SELECTED_SCREEN_TANDEM: &str = "joist.navigation.selectedScreen";

/// Model shared by every screen.
#[derive(Debug)]
pub struct RampModel {
    /// Ball height in meters.
    pub height: Observable<f64>,
    pub friction: Observable<bool>,
    pub released: Emitter<()>,
    /// Last status line read out to the user.
    pub status: Observable<String>,
}

impl RampModel {
    pub const MAX_HEIGHT: f64 = 5.0;

    #[must_use]
    pub fn new() -> Self {
        Self {
            height: Observable::new(1.0),
            friction: Observable::new(false),
            released: Emitter::new(),
            status: Observable::new(String::new()),
        }
    }

    /// Set the ball height, clamped to the ramp.
    pub fn set_height(&self, height: f64) {
        self.height.set(height.clamp(0.0, Self::MAX_HEIGHT));
    }
}

impl Default for RampModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Accessible nodes the description logic writes to.
#[derive(Debug)]
pub struct SimNodes {
    pub screens: Vec<(ScreenId, NodeHandle<AccessibleNode>)>,
    pub ball: NodeHandle<AccessibleNode>,
    pub announcer: NodeHandle<AccessibleNode>,
}

impl SimNodes {
    #[must_use]
    pub fn new() -> Self {
        Self {
            screens: SCREEN_REGISTRY
                .iter()
                .map(|meta| (meta.id, AccessibleNode::new().into_handle()))
                .collect(),
            ball: AccessibleNode::new().into_handle(),
            announcer: AccessibleNode::new().into_handle(),
        }
    }

    #[must_use]
    pub fn screen(&self, id: ScreenId) -> Option<&NodeHandle<AccessibleNode>> {
        self.screens
            .iter()
            .find(|(screen, _)| *screen == id)
            .map(|(_, node)| node)
    }
}

impl Default for SimNodes {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Strings
// ---------------------------------------------------------------------------

/// Bundled description strings, one JSON document per locale.
pub const BUNDLED_STRINGS: &[(&str, &str)] = &[
    (
        "en",
        r#"{
  "screen": {
    "home": { "name": "Home screen", "summary": "Three screens about a ball on a ramp." },
    "ramp": { "name": "Ramp screen", "summary": "A ball rests on an adjustable ramp." },
    "friction": { "name": "Friction screen", "summary": "Friction slows the rolling ball." },
    "energy": { "name": "Energy screen", "summary": "Energy moves between height and speed." }
  },
  "ball": {
    "name": "Ball",
    "height": "Ball is {{height}} meters above the floor.",
    "help": "Change the height, then release the ball.",
    "friction": { "on": "Friction is on.", "off": "Friction is off." }
  },
  "status": { "released": "Ball released." },
  "navigation": { "now": "Now on {{screen}}." }
}"#,
    ),
    (
        "es",
        r#"{
  "screen": {
    "home": { "name": "Pantalla de inicio" },
    "ramp": { "name": "Pantalla de rampa", "summary": "Una pelota descansa sobre una rampa ajustable." },
    "friction": { "name": "Pantalla de fricción" },
    "energy": { "name": "Pantalla de energía" }
  },
  "ball": {
    "name": "Pelota",
    "height": "La pelota está a {{height}} metros del suelo."
  },
  "status": { "released": "Pelota liberada." }
}"#,
    ),
    (
        "fr",
        r#"{
  "screen": {
    "ramp": { "name": "Écran de la rampe" }
  },
  "ball": { "name": "Balle" }
}"#,
    ),
];

fn fill(template: &str, key: &str, value: &str) -> String {
    template.replace(&format!("{{{{{key}}}}}"), value)
}

// ---------------------------------------------------------------------------
// Description plugins
// ---------------------------------------------------------------------------

pub const FULL_PLUGIN: &str = "ramp";
pub const TERSE_PLUGIN: &str = "ramp-terse";

/// Full description: names, live height, help text, release status and
/// screen-change announcements.
pub struct RampDescription {
    model: Rc<RampModel>,
    nodes: Rc<SimNodes>,
    registry: DescriptionRegistry,
}

impl RampDescription {
    #[must_use]
    pub fn new(model: Rc<RampModel>, nodes: Rc<SimNodes>, registry: DescriptionRegistry) -> Self {
        Self {
            model,
            nodes,
            registry,
        }
    }

    fn describe(
        &self,
        context: &DescriptionContext,
        strings: &DescriptionStrings,
    ) -> Result<(), DescriptionError> {
        describe_names(context, &self.nodes, strings)?;

        for (id, node) in &self.nodes.screens {
            let summary = strings.get(&format!("screen.{}.summary", id.key())).cloned();
            context.node_set(node, AccessibleNode::DESCRIPTION, summary)?;
        }

        let pattern = strings.get("ball.height").cloned().unwrap_or_default();
        let (ctx, ball) = (context.clone(), Rc::clone(&self.nodes.ball));
        context.link(&self.model.height, move |height| {
            let text = fill(&pattern, "height", &format!("{height:.1}"));
            if let Err(err) = ctx.node_set(&ball, AccessibleNode::DESCRIPTION, Some(text)) {
                tracing::debug!(%err, "height description skipped");
            }
        })?;

        let help = strings.get("ball.help").cloned().unwrap_or_default();
        let on = strings.get("ball.friction.on").cloned().unwrap_or_default();
        let off = strings.get("ball.friction.off").cloned().unwrap_or_default();
        let (ctx, ball, friction) = (
            context.clone(),
            Rc::clone(&self.nodes.ball),
            self.model.friction.clone(),
        );
        context.multilink(&[&self.model.height, &self.model.friction], move || {
            let state = if friction.get() { &on } else { &off };
            let text = format!("{help} {state}").trim().to_string();
            if let Err(err) = ctx.node_set(&ball, AccessibleNode::HELP_TEXT, Some(text)) {
                tracing::debug!(%err, "help text skipped");
            }
        })?;

        if let Some(released) = strings.get("status.released").cloned() {
            let (ctx, status) = (context.clone(), self.model.status.clone());
            context.add_listener(&self.model.released, move |_| {
                if let Err(err) = ctx.property_set(&status, released.clone()) {
                    tracing::debug!(%err, "release status skipped");
                }
            })?;
        }

        if let (Some(selected), Some(template)) = (
            self.registry
                .get_as::<Observable<ScreenId>>(SELECTED_SCREEN_TANDEM),
            strings.get("navigation.now").cloned(),
        ) {
            let names: Vec<(ScreenId, String)> = self
                .nodes
                .screens
                .iter()
                .map(|(id, _)| {
                    let name = strings
                        .get(&format!("screen.{}.name", id.key()))
                        .cloned()
                        .unwrap_or_else(|| id.title().to_string());
                    (*id, name)
                })
                .collect();
            let (ctx, announcer) = (context.clone(), Rc::clone(&self.nodes.announcer));
            context.lazy_link(&*selected, move |screen| {
                let name = names
                    .iter()
                    .find(|(id, _)| id == screen)
                    .map_or("", |(_, name)| name.as_str());
                let text = fill(&template, "screen", name);
                if let Err(err) =
                    ctx.node_set(&announcer, AccessibleNode::VOICING_NAME_RESPONSE, Some(text))
                {
                    tracing::debug!(%err, "announcement skipped");
                }
            })?;
        }

        Ok(())
    }
}

impl DescriptionLogic for RampDescription {
    fn launch(&self, context: &DescriptionContext, strings: &DescriptionStrings) {
        if let Err(err) = self.describe(context, strings) {
            tracing::warn!(%err, "ramp description aborted");
        }
    }

    fn added(&self, tandem_id: &str, _object: &RegistryObject) {
        tracing::debug!(tandem_id, "object available to description");
    }

    fn removed(&self, tandem_id: &str, _object: &RegistryObject) {
        tracing::debug!(tandem_id, "object withdrawn from description");
    }
}

/// Names only.
pub struct TerseDescription {
    nodes: Rc<SimNodes>,
}

impl TerseDescription {
    #[must_use]
    pub fn new(nodes: Rc<SimNodes>) -> Self {
        Self { nodes }
    }
}

impl DescriptionLogic for TerseDescription {
    fn launch(&self, context: &DescriptionContext, strings: &DescriptionStrings) {
        if let Err(err) = describe_names(context, &self.nodes, strings) {
            tracing::warn!(%err, "terse description aborted");
        }
    }
}

fn describe_names(
    context: &DescriptionContext,
    nodes: &SimNodes,
    strings: &DescriptionStrings,
) -> Result<(), DescriptionError> {
    for (id, node) in &nodes.screens {
        let name = strings.get(&format!("screen.{}.name", id.key())).cloned();
        context.node_set(node, AccessibleNode::ACCESSIBLE_NAME, name)?;
    }
    context.node_set(
        &nodes.ball,
        AccessibleNode::ACCESSIBLE_NAME,
        strings.get("ball.name").cloned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_screen_has_metadata() {
        for id in [ScreenId::Home, ScreenId::Ramp, ScreenId::Friction, ScreenId::Energy] {
            assert_eq!(screen_meta(id).id, id);
        }
        assert_eq!(ScreenId::Friction.key(), "friction");
    }

    #[test]
    fn fill_replaces_placeholder() {
        assert_eq!(fill("At {{height}} m", "height", "2.0"), "At 2.0 m");
        assert_eq!(fill("No placeholder", "height", "2.0"), "No placeholder");
    }

    #[test]
    fn bundled_strings_parse() {
        for (locale, json) in BUNDLED_STRINGS {
            let strings = joist_runtime::strings_from_json(locale, json).unwrap();
            assert!(strings.contains_key("ball.name"), "{locale} lacks ball.name");
        }
    }

    #[test]
    fn height_is_clamped() {
        let model = RampModel::new();
        model.set_height(9.0);
        assert_eq!(model.height.get(), RampModel::MAX_HEIGHT);
        model.set_height(-1.0);
        assert_eq!(model.height.get(), 0.0);
    }

    #[test]
    fn terse_logic_sets_names_only() {
        let nodes = Rc::new(SimNodes::new());
        let logic = TerseDescription::new(Rc::clone(&nodes));
        let strings =
            joist_runtime::strings_from_json("en", BUNDLED_STRINGS[0].1).unwrap();
        let context = DescriptionContext::standalone();
        logic.launch(&context, &strings);

        assert_eq!(nodes.ball.borrow().accessible_name.as_deref(), Some("Ball"));
        assert_eq!(nodes.ball.borrow().description, None);
        context.dispose();
        assert_eq!(nodes.ball.borrow().accessible_name, None);
    }
}
