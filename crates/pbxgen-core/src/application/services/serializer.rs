//! Text renderers for the project file, scheme files and property lists.
//!
//! Rendering is pure: the same graph always renders to the same bytes.

use std::collections::BTreeMap;

use crate::domain::{
    ActionCommon, BuildableReference, EnvironmentVariable, ExecutionAction, Isa, Object,
    ObjectGraph, ObjectId, PlistValue, SchemeDocument, Value,
};

/// First line of every project file.
pub const PROJECT_HEADER: &str = "// !$*UTF8*$!";
const SCHEME_VERSION: &str = "1.7";
const DEBUGGER: &str = "Xcode.DebuggerFoundation.Debugger.LLDB";
const LAUNCHER: &str = "Xcode.DebuggerFoundation.Launcher.LLDB";
const SHELL_ACTION: &str =
    "Xcode.IDEStandardExecutionActionsCore.ExecutionActionType.ShellScriptAction";

// ── Project file ─────────────────────────────────────────────────────────────

/// Render the object table in canonical order: one section per kind, kinds
/// sorted by name, objects sorted by id within a section.
pub fn render_project(graph: &ObjectGraph) -> String {
    let mut out = String::new();
    out.push_str(PROJECT_HEADER);
    out.push_str("\n{\n\tarchiveVersion = 1;\n\tclasses = {\n\t};\n");
    out.push_str(&format!("\tobjectVersion = {};\n", graph.object_version));
    out.push_str("\tobjects = {\n");

    let mut section: Option<Isa> = None;
    for (id, object) in graph.sorted_objects() {
        if section != Some(object.isa) {
            if let Some(previous) = section {
                out.push_str(&format!("/* End {previous} section */\n"));
            }
            out.push_str(&format!("\n/* Begin {} section */\n", object.isa));
            section = Some(object.isa);
        }
        render_object(&mut out, graph, id, object);
    }
    if let Some(previous) = section {
        out.push_str(&format!("/* End {previous} section */\n"));
    }

    out.push_str("\t};\n");
    if let Some(root) = graph.root() {
        out.push_str(&format!("\trootObject = {};\n", reference(graph, root)));
    }
    out.push_str("}\n");
    out
}

fn render_object(out: &mut String, graph: &ObjectGraph, id: &ObjectId, object: &Object) {
    out.push_str("\t\t");
    out.push_str(&labelled(id, &object.comment));
    if object.isa.is_inline() {
        out.push_str(&format!(" = {{isa = {}; ", object.isa));
        for (key, value) in &object.fields {
            out.push_str(&format!("{} = {}; ", quote(key), inline_value(graph, value)));
        }
        out.push_str("};\n");
        return;
    }

    out.push_str(" = {\n");
    out.push_str(&format!("\t\t\tisa = {};\n", object.isa));
    for (key, value) in &object.fields {
        out.push_str(&format!("\t\t\t{} = ", quote(key)));
        block_value(out, graph, value, 3);
        out.push_str(";\n");
    }
    out.push_str("\t\t};\n");
}

fn labelled(id: &ObjectId, comment: &str) -> String {
    if comment.is_empty() {
        id.to_string()
    } else {
        format!("{id} /* {comment} */")
    }
}

fn reference(graph: &ObjectGraph, id: &ObjectId) -> String {
    match graph.get(id) {
        Some(object) => labelled(id, &object.comment),
        None => id.to_string(),
    }
}

fn inline_value(graph: &ObjectGraph, value: &Value) -> String {
    match value {
        Value::String(s) => quote(s),
        Value::Id(id) => reference(graph, id),
        Value::Array(items) => {
            let items: String = items
                .iter()
                .map(|item| format!("{}, ", inline_value(graph, item)))
                .collect();
            format!("({items})")
        }
        Value::Map(map) => {
            let entries: String = map
                .iter()
                .map(|(key, value)| format!("{} = {}; ", quote(key), inline_value(graph, value)))
                .collect();
            format!("{{{entries}}}")
        }
    }
}

fn block_value(out: &mut String, graph: &ObjectGraph, value: &Value, depth: usize) {
    let indent = "\t".repeat(depth);
    match value {
        Value::Array(items) => {
            out.push_str("(\n");
            for item in items {
                out.push_str(&indent);
                out.push('\t');
                block_value(out, graph, item, depth + 1);
                out.push_str(",\n");
            }
            out.push_str(&indent);
            out.push(')');
        }
        Value::Map(map) => {
            out.push_str("{\n");
            for (key, value) in map {
                out.push_str(&format!("{indent}\t{} = ", quote(key)));
                block_value(out, graph, value, depth + 1);
                out.push_str(";\n");
            }
            out.push_str(&indent);
            out.push('}');
        }
        other => out.push_str(&inline_value(graph, other)),
    }
}

/// Quote a string unless it is made only of characters the format accepts
/// bare. `___` and `//` always force quoting, and so does a lone `-`.
pub fn quote(value: &str) -> String {
    let bare = !value.is_empty()
        && value != "-"
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_$/:.-".contains(c))
        && !value.contains("___")
        && !value.contains("//");
    if bare {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

// ── XML ──────────────────────────────────────────────────────────────────────

/// A scheme-file XML element. Attributes keep insertion order.
#[derive(Debug, Default)]
struct Element {
    name: &'static str,
    attributes: Vec<(&'static str, String)>,
    children: Vec<Element>,
}

impl Element {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    fn attr(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.attributes.push((key, value.into()));
        self
    }

    fn attr_opt(self, key: &'static str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.attr(key, value),
            None => self,
        }
    }

    fn flag(self, key: &'static str, value: bool) -> Self {
        self.attr(key, yes_no(value))
    }

    fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    fn child_opt(self, child: Option<Element>) -> Self {
        match child {
            Some(child) => self.child(child),
            None => self,
        }
    }

    /// Wrap `items` in a `name` element, or nothing when empty.
    fn list(name: &'static str, items: Vec<Element>) -> Option<Element> {
        (!items.is_empty()).then(|| Element {
            name,
            attributes: Vec::new(),
            children: items,
        })
    }

    fn render(&self, out: &mut String, depth: usize) {
        let indent = "   ".repeat(depth);
        out.push_str(&indent);
        out.push('<');
        out.push_str(self.name);
        for (key, value) in &self.attributes {
            out.push('\n');
            out.push_str(&indent);
            out.push_str(&format!("   {key} = \"{}\"", escape_xml(value)));
        }
        out.push_str(">\n");
        for child in &self.children {
            child.render(out, depth + 1);
        }
        out.push_str(&indent);
        out.push_str(&format!("</{}>\n", self.name));
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "YES" } else { "NO" }
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\n' => escaped.push_str("&#10;"),
            c => escaped.push(c),
        }
    }
    escaped
}

// ── Scheme files ─────────────────────────────────────────────────────────────

/// Render one scheme document. `LastUpgradeVersion` is taken from the
/// project attributes of `graph`.
pub fn render_scheme(graph: &ObjectGraph, document: &SchemeDocument) -> String {
    let scheme = &document.scheme;
    let renderer = SchemeRenderer { document };

    let mut root = Element::new("Scheme")
        .attr_opt("LastUpgradeVersion", last_upgrade_check(graph))
        .attr("version", SCHEME_VERSION);

    let build = &scheme.build;
    let mut entries = Vec::new();
    for target in &build.targets {
        let entry = Element::new("BuildActionEntry")
            .flag("buildForTesting", target.build_for.testing)
            .flag("buildForRunning", target.build_for.running)
            .flag("buildForProfiling", target.build_for.profiling)
            .flag("buildForArchiving", target.build_for.archiving)
            .flag("buildForAnalyzing", target.build_for.analyzing)
            .child_opt(renderer.buildable(&target.target));
        entries.push(entry);
    }
    root = root.child(
        Element::new("BuildAction")
            .flag("parallelizeBuildables", build.parallelize_build)
            .flag("buildImplicitDependencies", build.build_implicit_dependencies)
            .child_opt(renderer.actions("PreActions", &build.pre_actions))
            .child_opt(renderer.actions("PostActions", &build.post_actions))
            .child_opt(Element::list("BuildActionEntries", entries)),
    );

    if let Some(test) = &scheme.test {
        let testables = test
            .targets
            .iter()
            .map(|target| {
                let skipped = target
                    .skipped_tests
                    .iter()
                    .map(|name| Element::new("Test").attr("Identifier", name.as_str()))
                    .collect();
                Element::new("TestableReference")
                    .attr("skipped", "NO")
                    .flag("parallelizable", target.parallelizable)
                    .flag("randomExecutionOrdering", target.random_execution_order)
                    .child_opt(renderer.buildable(&target.target))
                    .child_opt(Element::list("SkippedTests", skipped))
            })
            .collect();
        let plans = test
            .test_plans
            .iter()
            .map(|plan| {
                Element::new("TestPlanReference")
                    .attr("reference", format!("container:{}", plan.path))
                    .attr_opt("default", plan.default_plan.then_some("YES"))
            })
            .collect();
        let coverage = test
            .coverage_targets
            .iter()
            .filter_map(|target| renderer.buildable(target))
            .collect();

        let element = Element::new("TestAction")
            .attr_opt("buildConfiguration", test.common.config.as_deref())
            .attr("selectedDebuggerIdentifier", DEBUGGER)
            .attr("selectedLauncherIdentifier", LAUNCHER)
            .flag(
                "shouldUseLaunchSchemeArgsEnv",
                test.common.should_use_launch_scheme_args_env(),
            )
            .attr_opt("codeCoverageEnabled", test.gather_coverage.then_some("YES"))
            .attr_opt(
                "onlyGenerateCoverageForSpecifiedTargets",
                (test.gather_coverage && !test.coverage_targets.is_empty()).then_some("YES"),
            );
        root = root.child(
            renderer
                .common(element, &test.common)
                .child_opt(Element::list("TestPlans", plans))
                .child_opt(Element::list("Testables", testables))
                .child_opt(Element::list("CodeCoverageTargets", coverage)),
        );
    }

    if let Some(run) = &scheme.run {
        let element = Element::new("LaunchAction")
            .attr_opt("buildConfiguration", run.common.config.as_deref())
            .attr("selectedDebuggerIdentifier", DEBUGGER)
            .attr("selectedLauncherIdentifier", LAUNCHER)
            .attr("launchStyle", "0")
            .attr("useCustomWorkingDirectory", "NO")
            .attr("ignoresPersistentStateOnLaunch", "NO")
            .attr("debugDocumentVersioning", "YES")
            .attr("debugServiceExtension", "internal")
            .attr("allowLocationSimulation", "YES");
        root = root.child(
            renderer
                .common(element, &run.common)
                .child_opt(renderer.runnable()),
        );
    }

    if let Some(profile) = &scheme.profile {
        let element = Element::new("ProfileAction")
            .attr_opt("buildConfiguration", profile.common.config.as_deref())
            .flag(
                "shouldUseLaunchSchemeArgsEnv",
                profile.common.should_use_launch_scheme_args_env(),
            )
            .attr("savedToolIdentifier", "")
            .attr("useCustomWorkingDirectory", "NO")
            .attr("debugDocumentVersioning", "YES");
        root = root.child(
            renderer
                .common(element, &profile.common)
                .child_opt(renderer.runnable()),
        );
    }

    if let Some(analyze) = &scheme.analyze {
        root = root.child(
            Element::new("AnalyzeAction").attr_opt("buildConfiguration", analyze.config.as_deref()),
        );
    }

    if let Some(archive) = &scheme.archive {
        let element = Element::new("ArchiveAction")
            .attr_opt("buildConfiguration", archive.common.config.as_deref())
            .attr_opt("customArchiveName", archive.custom_archive_name.as_deref())
            .flag("revealArchiveInOrganizer", archive.reveal_archive_in_organizer);
        root = root.child(renderer.common(element, &archive.common));
    }

    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    root.render(&mut out, 0);
    out
}

fn last_upgrade_check(graph: &ObjectGraph) -> Option<String> {
    let project = graph.get(graph.root()?)?;
    match project.get("attributes") {
        Some(Value::Map(attributes)) => match attributes.get("LastUpgradeCheck") {
            Some(Value::String(version)) => Some(version.clone()),
            _ => None,
        },
        _ => None,
    }
}

struct SchemeRenderer<'a> {
    document: &'a SchemeDocument,
}

impl SchemeRenderer<'_> {
    fn reference(reference: &BuildableReference) -> Element {
        Element::new("BuildableReference")
            .attr("BuildableIdentifier", "primary")
            .attr("BlueprintIdentifier", reference.blueprint_id.as_str())
            .attr("BuildableName", reference.buildable_name.as_str())
            .attr("BlueprintName", reference.blueprint_name.as_str())
            .attr("ReferencedContainer", reference.container.as_str())
    }

    fn buildable(&self, target: &str) -> Option<Element> {
        self.document.buildables.get(target).map(Self::reference)
    }

    /// The launch target, as a runnable product or a macro expansion for
    /// targets that cannot run on their own.
    fn runnable(&self) -> Option<Element> {
        let target = self.document.launch_target.as_deref()?;
        let reference = self.buildable(target)?;
        Some(if self.document.launch_runnable {
            Element::new("BuildableProductRunnable")
                .attr("runnableDebuggingMode", "0")
                .child(reference)
        } else {
            Element::new("MacroExpansion").child(reference)
        })
    }

    /// Pre/post actions, arguments and environment shared by most actions.
    fn common(&self, element: Element, common: &ActionCommon) -> Element {
        let arguments = common
            .command_line_arguments
            .iter()
            .map(|(argument, enabled)| {
                Element::new("CommandLineArgument")
                    .attr("argument", argument.as_str())
                    .flag("isEnabled", *enabled)
            })
            .collect();
        element
            .child_opt(self.actions("PreActions", &common.pre_actions))
            .child_opt(self.actions("PostActions", &common.post_actions))
            .child_opt(Element::list("CommandLineArguments", arguments))
            .child_opt(environment(&common.environment_variables))
    }

    fn actions(&self, name: &'static str, actions: &[ExecutionAction]) -> Option<Element> {
        let items = actions
            .iter()
            .map(|action| {
                let environment = action
                    .settings_target
                    .as_deref()
                    .and_then(|target| self.buildable(target))
                    .map(|reference| Element::new("EnvironmentBuildable").child(reference));
                Element::new("ExecutionAction")
                    .attr("ActionType", SHELL_ACTION)
                    .child(
                        Element::new("ActionContent")
                            .attr("title", action.display_name())
                            .attr("scriptText", action.script.as_str())
                            .child_opt(environment),
                    )
            })
            .collect();
        Element::list(name, items)
    }
}

fn environment(variables: &[EnvironmentVariable]) -> Option<Element> {
    let items = variables
        .iter()
        .map(|variable| {
            Element::new("EnvironmentVariable")
                .attr("key", variable.variable.as_str())
                .attr("value", variable.value.as_str())
                .flag("isEnabled", variable.enabled)
        })
        .collect();
    Element::list("EnvironmentVariables", items)
}

// ── Property lists ───────────────────────────────────────────────────────────

/// Render an XML property list with keys in sorted order.
pub fn render_plist(properties: &BTreeMap<String, PlistValue>) -> String {
    let mut out = String::from(concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" ",
        "\"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n",
        "<plist version=\"1.0\">\n",
    ));
    plist_dict(&mut out, properties, 0);
    out.push_str("</plist>\n");
    out
}

fn plist_dict(out: &mut String, entries: &BTreeMap<String, PlistValue>, depth: usize) {
    let indent = "\t".repeat(depth);
    out.push_str(&format!("{indent}<dict>\n"));
    for (key, value) in entries {
        out.push_str(&format!("{indent}\t<key>{}</key>\n", escape_xml(key)));
        plist_value(out, value, depth + 1);
    }
    out.push_str(&format!("{indent}</dict>\n"));
}

fn plist_value(out: &mut String, value: &PlistValue, depth: usize) {
    let indent = "\t".repeat(depth);
    match value {
        PlistValue::Bool(true) => out.push_str(&format!("{indent}<true/>\n")),
        PlistValue::Bool(false) => out.push_str(&format!("{indent}<false/>\n")),
        PlistValue::Integer(n) => out.push_str(&format!("{indent}<integer>{n}</integer>\n")),
        PlistValue::String(s) => {
            out.push_str(&format!("{indent}<string>{}</string>\n", escape_xml(s)))
        }
        PlistValue::Array(items) => {
            out.push_str(&format!("{indent}<array>\n"));
            for item in items {
                plist_value(out, item, depth + 1);
            }
            out.push_str(&format!("{indent}</array>\n"));
        }
        PlistValue::Dictionary(entries) => plist_dict(out, entries, depth),
    }
}
