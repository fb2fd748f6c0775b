//! Template registry.
//!
//! Every template is compiled into the binary and registered once in a
//! minijinja [`Environment`]. Lookup goes through an exhaustive match over
//! `(StackVariant, ArtifactKind)`, so adding a variant or an artifact kind
//! fails to compile until its templates are chosen.

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;

use super::artifact::ArtifactKind;
use crate::error::GenerationError;
use crate::schema::StackVariant;

/// Identifies one compiled template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateId {
    Model,
    Migration,
    Request,
    Resource,
    ApiController,
    WebController,
    InertiaController,
    LivewireController,
    BladeView,
    VueView,
    ReactView,
    VoltView,
    ApiRoutes,
    WebRoutes,
    /// Trailing migration adding constraints deferred out of a reference cycle
    DeferredForeignKeys,
    Skeleton(SkeletonTemplate),
}

/// Templates for the static project skeleton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkeletonTemplate {
    Composer,
    Package,
    EnvExample,
    GitIgnore,
    KeepGitIgnore,
    Artisan,
    BootstrapApp,
    BootstrapProviders,
    PublicIndex,
    ConsoleRoutes,
    WebRoutes,
    ApiRoutes,
    BaseController,
    AppServiceProvider,
    VoltServiceProvider,
    InertiaMiddleware,
    ViteConfig,
    AppScript,
    AppCss,
    InertiaRoot,
    Layout,
    LivewireHost,
    Readme,
}

const ENTITY_TEMPLATES: &[(TemplateId, &str, &str)] = &[
    (TemplateId::Model, "entity/model.php", include_str!("../../templates/entity/model.php.j2")),
    (TemplateId::Migration, "entity/migration.php", include_str!("../../templates/entity/migration.php.j2")),
    (TemplateId::Request, "entity/request.php", include_str!("../../templates/entity/request.php.j2")),
    (TemplateId::Resource, "entity/resource.php", include_str!("../../templates/entity/resource.php.j2")),
    (TemplateId::ApiController, "entity/controller_api.php", include_str!("../../templates/entity/controller_api.php.j2")),
    (TemplateId::WebController, "entity/controller_web.php", include_str!("../../templates/entity/controller_web.php.j2")),
    (TemplateId::InertiaController, "entity/controller_inertia.php", include_str!("../../templates/entity/controller_inertia.php.j2")),
    (TemplateId::LivewireController, "entity/controller_livewire.php", include_str!("../../templates/entity/controller_livewire.php.j2")),
    (TemplateId::BladeView, "entity/view_blade.blade.php", include_str!("../../templates/entity/view_blade.blade.php.j2")),
    (TemplateId::VueView, "entity/view_vue.vue", include_str!("../../templates/entity/view_vue.vue.j2")),
    (TemplateId::ReactView, "entity/view_react.jsx", include_str!("../../templates/entity/view_react.jsx.j2")),
    (TemplateId::VoltView, "entity/view_volt.blade.php", include_str!("../../templates/entity/view_volt.blade.php.j2")),
    (TemplateId::ApiRoutes, "entity/routes_api.php", include_str!("../../templates/entity/routes_api.php.j2")),
    (TemplateId::WebRoutes, "entity/routes_web.php", include_str!("../../templates/entity/routes_web.php.j2")),
    (TemplateId::DeferredForeignKeys, "entity/foreign_keys.php", include_str!("../../templates/entity/foreign_keys.php.j2")),
];

const SKELETON_TEMPLATES: &[(SkeletonTemplate, &str, &str)] = &[
    (SkeletonTemplate::Composer, "skeleton/composer.json", include_str!("../../templates/skeleton/composer.json.j2")),
    (SkeletonTemplate::Package, "skeleton/package.json", include_str!("../../templates/skeleton/package.json.j2")),
    (SkeletonTemplate::EnvExample, "skeleton/env.example", include_str!("../../templates/skeleton/env.example.j2")),
    (SkeletonTemplate::GitIgnore, "skeleton/gitignore", include_str!("../../templates/skeleton/gitignore.j2")),
    (SkeletonTemplate::KeepGitIgnore, "skeleton/keep.gitignore", include_str!("../../templates/skeleton/keep.gitignore.j2")),
    (SkeletonTemplate::Artisan, "skeleton/artisan", include_str!("../../templates/skeleton/artisan.j2")),
    (SkeletonTemplate::BootstrapApp, "skeleton/bootstrap_app.php", include_str!("../../templates/skeleton/bootstrap_app.php.j2")),
    (SkeletonTemplate::BootstrapProviders, "skeleton/bootstrap_providers.php", include_str!("../../templates/skeleton/bootstrap_providers.php.j2")),
    (SkeletonTemplate::PublicIndex, "skeleton/public_index.php", include_str!("../../templates/skeleton/public_index.php.j2")),
    (SkeletonTemplate::ConsoleRoutes, "skeleton/routes_console.php", include_str!("../../templates/skeleton/routes_console.php.j2")),
    (SkeletonTemplate::WebRoutes, "skeleton/routes_web.php", include_str!("../../templates/skeleton/routes_web.php.j2")),
    (SkeletonTemplate::ApiRoutes, "skeleton/routes_api.php", include_str!("../../templates/skeleton/routes_api.php.j2")),
    (SkeletonTemplate::BaseController, "skeleton/controller.php", include_str!("../../templates/skeleton/controller.php.j2")),
    (SkeletonTemplate::AppServiceProvider, "skeleton/app_service_provider.php", include_str!("../../templates/skeleton/app_service_provider.php.j2")),
    (SkeletonTemplate::VoltServiceProvider, "skeleton/volt_service_provider.php", include_str!("../../templates/skeleton/volt_service_provider.php.j2")),
    (SkeletonTemplate::InertiaMiddleware, "skeleton/handle_inertia_requests.php", include_str!("../../templates/skeleton/handle_inertia_requests.php.j2")),
    (SkeletonTemplate::ViteConfig, "skeleton/vite.config.js", include_str!("../../templates/skeleton/vite.config.js.j2")),
    (SkeletonTemplate::AppScript, "skeleton/app.js", include_str!("../../templates/skeleton/app.js.j2")),
    (SkeletonTemplate::AppCss, "skeleton/app.css", include_str!("../../templates/skeleton/app.css.j2")),
    (SkeletonTemplate::InertiaRoot, "skeleton/inertia_root.blade.php", include_str!("../../templates/skeleton/inertia_root.blade.php.j2")),
    (SkeletonTemplate::Layout, "skeleton/layout.blade.php", include_str!("../../templates/skeleton/layout.blade.php.j2")),
    (SkeletonTemplate::LivewireHost, "skeleton/host.blade.php", include_str!("../../templates/skeleton/host.blade.php.j2")),
    (SkeletonTemplate::Readme, "skeleton/README.md", include_str!("../../templates/skeleton/README.md.j2")),
];

impl TemplateId {
    /// Name the template is registered under
    pub fn name(&self) -> &'static str {
        match self {
            TemplateId::Skeleton(s) => SKELETON_TEMPLATES
                .iter()
                .find(|(id, _, _)| id == s)
                .map(|(_, name, _)| *name)
                .unwrap_or("skeleton/unknown"),
            other => ENTITY_TEMPLATES
                .iter()
                .find(|(id, _, _)| id == other)
                .map(|(_, name, _)| *name)
                .unwrap_or("entity/unknown"),
        }
    }
}

/// Compiled templates for every stack variant.
///
/// Cheap to share: rendering only takes `&self`.
pub struct TemplateRegistry {
    env: Environment<'static>,
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("templates", &(ENTITY_TEMPLATES.len() + SKELETON_TEMPLATES.len()))
            .finish()
    }
}

impl TemplateRegistry {
    /// Compile all built-in templates
    pub fn new() -> Result<Self, GenerationError> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        // Echo delimiters of the generated Blade/Vue/JSX code
        env.add_global("open", "{{");
        env.add_global("close", "}}");

        let sources = ENTITY_TEMPLATES
            .iter()
            .map(|(_, name, source)| (*name, *source))
            .chain(SKELETON_TEMPLATES.iter().map(|(_, name, source)| (*name, *source)));

        for (name, source) in sources {
            env.add_template(name, source)
                .map_err(|source| GenerationError::Template {
                    template: name.to_string(),
                    source,
                })?;
        }

        tracing::debug!(
            templates = ENTITY_TEMPLATES.len() + SKELETON_TEMPLATES.len(),
            "compiled template registry"
        );
        Ok(TemplateRegistry { env })
    }

    /// Template for one artifact kind under a stack variant
    pub fn template_for(
        &self,
        variant: StackVariant,
        kind: ArtifactKind,
    ) -> Result<TemplateId, GenerationError> {
        use ArtifactKind as K;
        use StackVariant as V;

        let id = match (variant, kind) {
            (_, K::Record) => TemplateId::Model,
            (_, K::Migration) => TemplateId::Migration,
            (_, K::Request) => TemplateId::Request,
            (_, K::Resource) => TemplateId::Resource,

            (V::JsonApiOnly, K::Controller) => TemplateId::ApiController,
            (V::ServerTemplate, K::Controller) => TemplateId::WebController,
            (V::ReactiveComponentA | V::ReactiveComponentB, K::Controller) => {
                TemplateId::InertiaController
            }
            (V::LiveServerComponent, K::Controller) => TemplateId::LivewireController,

            (V::ServerTemplate, K::View) => TemplateId::BladeView,
            (V::ReactiveComponentA, K::View) => TemplateId::VueView,
            (V::ReactiveComponentB, K::View) => TemplateId::ReactView,
            (V::LiveServerComponent, K::View) => TemplateId::VoltView,
            (V::JsonApiOnly, K::View) => {
                return Err(GenerationError::UnsupportedArtifactForVariant { variant, kind })
            }

            (V::JsonApiOnly, K::Routes) => TemplateId::ApiRoutes,
            (
                V::ServerTemplate
                | V::ReactiveComponentA
                | V::ReactiveComponentB
                | V::LiveServerComponent,
                K::Routes,
            ) => TemplateId::WebRoutes,
        };
        Ok(id)
    }

    /// Render a template with a serializable context
    pub fn render<C: Serialize>(&self, id: TemplateId, ctx: &C) -> Result<String, GenerationError> {
        let name = id.name();
        let wrap = |source: minijinja::Error| GenerationError::Template {
            template: name.to_string(),
            source,
        };
        let template = self.env.get_template(name).map_err(wrap)?;
        template.render(ctx).map_err(wrap)
    }
}
