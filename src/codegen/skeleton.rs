//! Static project skeleton per stack variant.
//!
//! The skeleton is the non-generated scaffold every project of a variant
//! shares: dependency manifests, entry points, layouts and placeholder
//! route files. Generated artifacts are layered on top by the assembler.

use serde::Serialize;
use std::collections::BTreeMap;

use super::naming::NameForms;
use super::renderer::VariantFlags;
use super::templates::{SkeletonTemplate, TemplateId, TemplateRegistry};
use crate::error::GenerationError;
use crate::schema::StackVariant;

/// Directories that must exist at runtime but hold no tracked files
const KEEP_DIRS: [&str; 6] = [
    "bootstrap/cache",
    "storage/app",
    "storage/framework/cache",
    "storage/framework/sessions",
    "storage/framework/views",
    "storage/logs",
];

#[derive(Debug, Serialize)]
struct SkeletonContext<'a> {
    project: &'a NameForms,
    variant: VariantFlags,
    entry_script: &'static str,
}

/// Relative path → template for every skeleton file of a variant, in path order
pub fn skeleton_layout(variant: StackVariant) -> BTreeMap<String, SkeletonTemplate> {
    use SkeletonTemplate as S;

    let mut files: BTreeMap<String, SkeletonTemplate> = [
        ("composer.json", S::Composer),
        (".env.example", S::EnvExample),
        (".gitignore", S::GitIgnore),
        ("artisan", S::Artisan),
        ("README.md", S::Readme),
        ("bootstrap/app.php", S::BootstrapApp),
        ("bootstrap/providers.php", S::BootstrapProviders),
        ("public/index.php", S::PublicIndex),
        ("routes/console.php", S::ConsoleRoutes),
        ("routes/web.php", S::WebRoutes),
        ("app/Http/Controllers/Controller.php", S::BaseController),
        ("app/Providers/AppServiceProvider.php", S::AppServiceProvider),
    ]
    .into_iter()
    .map(|(path, template)| (path.to_string(), template))
    .collect();

    for dir in KEEP_DIRS {
        files.insert(format!("{}/.gitignore", dir), S::KeepGitIgnore);
    }

    if variant.has_views() {
        files.insert("package.json".to_string(), S::Package);
        files.insert("vite.config.js".to_string(), S::ViteConfig);
        files.insert("resources/css/app.css".to_string(), S::AppCss);
        files.insert(entry_script(variant).to_string(), S::AppScript);
    }

    match variant {
        StackVariant::JsonApiOnly => {
            files.insert("routes/api.php".to_string(), S::ApiRoutes);
        }
        StackVariant::ServerTemplate => {
            files.insert("resources/views/components/layouts/app.blade.php".to_string(), S::Layout);
        }
        StackVariant::ReactiveComponentA | StackVariant::ReactiveComponentB => {
            files.insert("resources/views/app.blade.php".to_string(), S::InertiaRoot);
            files.insert(
                "app/Http/Middleware/HandleInertiaRequests.php".to_string(),
                S::InertiaMiddleware,
            );
        }
        StackVariant::LiveServerComponent => {
            files.insert("resources/views/components/layouts/app.blade.php".to_string(), S::Layout);
            files.insert("resources/views/host.blade.php".to_string(), S::LivewireHost);
            files.insert("app/Providers/VoltServiceProvider.php".to_string(), S::VoltServiceProvider);
        }
    }

    files
}

fn entry_script(variant: StackVariant) -> &'static str {
    match variant {
        StackVariant::ReactiveComponentB => "resources/js/app.jsx",
        _ => "resources/js/app.js",
    }
}

/// Render the skeleton for a project
pub fn render_skeleton(
    registry: &TemplateRegistry,
    variant: StackVariant,
    project: &NameForms,
) -> Result<BTreeMap<String, Vec<u8>>, GenerationError> {
    let ctx = SkeletonContext {
        project,
        variant: VariantFlags::of(variant),
        entry_script: entry_script(variant),
    };

    let mut files = BTreeMap::new();
    for (path, template) in skeleton_layout(variant) {
        let content = registry.render(TemplateId::Skeleton(template), &ctx)?;
        files.insert(path, content.into_bytes());
    }

    tracing::debug!(variant = %variant, files = files.len(), "rendered project skeleton");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(variant: StackVariant) -> BTreeMap<String, Vec<u8>> {
        let registry = TemplateRegistry::new().unwrap();
        let project = NameForms::project("Shop").unwrap();
        render_skeleton(&registry, variant, &project).unwrap()
    }

    fn text(files: &BTreeMap<String, Vec<u8>>, path: &str) -> String {
        String::from_utf8(files.get(path).cloned().unwrap()).unwrap()
    }

    #[test]
    fn test_api_skeleton_has_no_frontend() {
        let files = render(StackVariant::JsonApiOnly);
        assert!(files.contains_key("routes/api.php"));
        assert!(!files.contains_key("package.json"));
        assert!(text(&files, "bootstrap/app.php").contains("api: __DIR__.'/../routes/api.php'"));
        assert!(text(&files, "app/Providers/AppServiceProvider.php").contains("JsonResource::withoutWrapping();"));
    }

    #[test]
    fn test_inertia_skeletons() {
        let vue = render(StackVariant::ReactiveComponentA);
        assert!(text(&vue, "composer.json").contains("inertiajs/inertia-laravel"));
        assert!(text(&vue, "package.json").contains("\"vue\""));
        assert!(text(&vue, "resources/js/app.js").contains("@inertiajs/vue3"));
        assert!(text(&vue, "bootstrap/app.php").contains("HandleInertiaRequests"));

        let react = render(StackVariant::ReactiveComponentB);
        assert!(react.contains_key("resources/js/app.jsx"));
        assert!(text(&react, "resources/views/app.blade.php").contains("@viteReactRefresh"));
    }

    #[test]
    fn test_package_json_is_valid_json() {
        for variant in [
            StackVariant::ServerTemplate,
            StackVariant::ReactiveComponentA,
            StackVariant::ReactiveComponentB,
            StackVariant::LiveServerComponent,
        ] {
            let files = render(variant);
            let parsed: serde_json::Value = serde_json::from_slice(&files["package.json"]).unwrap();
            assert!(parsed["devDependencies"]["vite"].is_string(), "{}", variant);
        }
        for variant in StackVariant::ALL {
            let files = render(variant);
            let parsed: serde_json::Value = serde_json::from_slice(&files["composer.json"]).unwrap();
            assert_eq!(parsed["name"], "app/shop");
        }
    }

    #[test]
    fn test_livewire_skeleton() {
        let files = render(StackVariant::LiveServerComponent);
        assert!(text(&files, "bootstrap/providers.php").contains("VoltServiceProvider"));
        assert!(text(&files, "resources/views/components/layouts/app.blade.php").contains("{{ $slot }}"));
        assert!(files.contains_key("storage/framework/views/.gitignore"));
    }
}
