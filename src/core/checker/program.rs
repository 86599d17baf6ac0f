//! Files known to the checker and module-level declaration lookup.
//!
//! Units are loaded lazily: project files from disk when first imported,
//! generated type-check translations when the bridge registers them, and
//! bundled declaration files for the packages Angular components commonly
//! import.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use swc_ecma_ast::{
    Class, DefaultDecl, ExportSpecifier, FnDecl, ImportSpecifier, ModuleDecl,
    ModuleExportName, ModuleItem, Stmt, TsEnumDecl, TsInterfaceDecl, TsTypeAliasDecl, VarDecl,
    VarDeclarator,
};
use tracing::debug;

use crate::core::error::ExtractError;
use crate::core::parsers::{ParsedSource, parse_ts_source};

/// Root of the virtual paths used for bundled declaration files.
pub const LIB_ROOT: &str = "/__ngflags__/lib";

const GLOBALS_LIB: &str = "globals";

/// Export name of `export default`, also used as the name of an anonymous
/// default-exported class.
pub const DEFAULT_EXPORT: &str = "default";

/// Bundled declaration files: (module specifier or lib name, source).
const LIBS: &[(&str, &str)] = &[
    (GLOBALS_LIB, include_str!("lib/globals.d.ts")),
    ("@angular/core", include_str!("lib/angular_core.d.ts")),
    ("@angular/core/rxjs-interop", include_str!("lib/rxjs_interop.d.ts")),
    ("rxjs", include_str!("lib/rxjs.d.ts")),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// A project file read from disk.
    Source,
    /// A generated type-check translation.
    Translation,
    /// A bundled declaration file.
    Library,
}

/// One parsed file.
pub struct SourceUnit {
    pub path: PathBuf,
    pub text: String,
    pub parsed: ParsedSource,
    pub kind: UnitKind,
}

impl std::fmt::Debug for SourceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceUnit")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .finish()
    }
}

/// A module-level declaration found by name.
#[derive(Clone, Copy)]
pub enum Decl<'a> {
    /// A class declaration or a default-exported class, by name.
    Class(&'a str, &'a Class),
    Interface(&'a TsInterfaceDecl),
    Alias(&'a TsTypeAliasDecl),
    Enum(&'a TsEnumDecl),
    Function(&'a FnDecl),
    Var(&'a VarDecl, &'a VarDeclarator),
    /// `import { imported as name } from 'module'`. `imported` is `default`
    /// for default imports.
    Import {
        module: &'a str,
        imported: &'a str,
    },
    /// `import * as name from 'module'`.
    NamespaceImport { module: &'a str },
    /// `export { name } from 'module'`.
    ReExport {
        module: &'a str,
        imported: &'a str,
    },
}

impl SourceUnit {
    fn parse(path: PathBuf, text: String, kind: UnitKind) -> Result<Self, ExtractError> {
        let parsed = parse_ts_source(text.clone(), &path.to_string_lossy()).map_err(|message| {
            ExtractError::SourceParse {
                path: path.clone(),
                message,
            }
        })?;
        Ok(Self {
            path,
            text,
            parsed,
            kind,
        })
    }

    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("/"))
    }

    /// All module-level declarations named `name`, in source order.
    ///
    /// Interfaces may be declared several times and merge.
    pub fn find_decls<'a>(&'a self, name: &str) -> Vec<Decl<'a>> {
        let mut found = Vec::new();
        for item in &self.parsed.module.body {
            match item {
                ModuleItem::Stmt(Stmt::Decl(decl)) => collect_decl(decl, name, &mut found),
                ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
                    collect_decl(&export.decl, name, &mut found)
                }
                ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(export)) => match &export.decl {
                    DefaultDecl::TsInterfaceDecl(iface) if &*iface.id.sym == name => {
                        found.push(Decl::Interface(iface));
                    }
                    DefaultDecl::Class(class) => {
                        let class_name = class.ident.as_ref().map_or(DEFAULT_EXPORT, |id| &*id.sym);
                        if class_name == name {
                            found.push(Decl::Class(class_name, &class.class));
                        }
                    }
                    _ => {}
                },
                ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => {
                    let Some(module) = import.src.value.as_str() else {
                        continue;
                    };
                    for spec in &import.specifiers {
                        match spec {
                            ImportSpecifier::Named(named) if &*named.local.sym == name => {
                                let imported = match &named.imported {
                                    Some(ModuleExportName::Ident(ident)) => &*ident.sym,
                                    Some(ModuleExportName::Str(s)) => {
                                        s.value.as_str().unwrap_or_default()
                                    }
                                    None => &*named.local.sym,
                                };
                                found.push(Decl::Import { module, imported });
                            }
                            ImportSpecifier::Default(default) if &*default.local.sym == name => {
                                found.push(Decl::Import {
                                    module,
                                    imported: DEFAULT_EXPORT,
                                });
                            }
                            ImportSpecifier::Namespace(ns) if &*ns.local.sym == name => {
                                found.push(Decl::NamespaceImport { module });
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }
        found
    }

    /// First module-level declaration named `name`.
    pub fn find_decl<'a>(&'a self, name: &str) -> Option<Decl<'a>> {
        self.find_decls(name).into_iter().next()
    }

    /// Declaration exported under `name`, following `export { a as b }` lists.
    pub fn find_export<'a>(&'a self, name: &str) -> Option<Decl<'a>> {
        if name == DEFAULT_EXPORT {
            return self.find_default_export();
        }
        for item in &self.parsed.module.body {
            let ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(named)) = item else {
                continue;
            };
            for spec in &named.specifiers {
                let ExportSpecifier::Named(spec) = spec else {
                    continue;
                };
                let orig = export_name(&spec.orig);
                let exported = spec.exported.as_ref().map(export_name).unwrap_or(orig);
                if exported != name {
                    continue;
                }
                return match named.src.as_ref().and_then(|src| src.value.as_str()) {
                    Some(module) => Some(Decl::ReExport {
                        module,
                        imported: orig,
                    }),
                    None => self.find_decl(orig),
                };
            }
        }
        self.find_decl(name)
    }

    fn find_default_export(&self) -> Option<Decl<'_>> {
        self.parsed.module.body.iter().find_map(|item| match item {
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(export)) => match &export.decl {
                DefaultDecl::TsInterfaceDecl(iface) => Some(Decl::Interface(iface)),
                DefaultDecl::Class(class) => Some(Decl::Class(
                    class.ident.as_ref().map_or(DEFAULT_EXPORT, |id| &*id.sym),
                    &class.class,
                )),
                _ => None,
            },
            _ => None,
        })
    }
}

fn export_name(name: &ModuleExportName) -> &str {
    match name {
        ModuleExportName::Ident(ident) => &ident.sym,
        ModuleExportName::Str(s) => s.value.as_str().unwrap_or_default(),
    }
}

fn collect_decl<'a>(decl: &'a swc_ecma_ast::Decl, name: &str, found: &mut Vec<Decl<'a>>) {
    match decl {
        swc_ecma_ast::Decl::Class(class) if &*class.ident.sym == name => {
            found.push(Decl::Class(&*class.ident.sym, &class.class))
        }
        swc_ecma_ast::Decl::Fn(func) if &*func.ident.sym == name => {
            found.push(Decl::Function(func))
        }
        swc_ecma_ast::Decl::TsInterface(iface) if &*iface.id.sym == name => {
            found.push(Decl::Interface(iface))
        }
        swc_ecma_ast::Decl::TsTypeAlias(alias) if &*alias.id.sym == name => {
            found.push(Decl::Alias(alias))
        }
        swc_ecma_ast::Decl::TsEnum(decl) if &*decl.id.sym == name => found.push(Decl::Enum(decl)),
        swc_ecma_ast::Decl::Var(var) => {
            for declarator in &var.decls {
                if let swc_ecma_ast::Pat::Ident(ident) = &declarator.name
                    && &*ident.id.sym == name
                {
                    found.push(Decl::Var(var, declarator));
                }
            }
        }
        _ => {}
    }
}

/// Result of resolving an import specifier.
#[derive(Debug, Clone)]
pub enum ModuleTarget {
    Unit(Rc<SourceUnit>),
    /// A package that is not part of the program.
    External(String),
}

/// All files known to the checker for one run.
#[derive(Default)]
pub struct Program {
    units: RefCell<HashMap<PathBuf, Rc<SourceUnit>>>,
    unavailable: RefCell<HashSet<PathBuf>>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a project file, reusing an already parsed unit.
    pub fn load(&self, path: &Path) -> Result<Rc<SourceUnit>, ExtractError> {
        if let Some(unit) = self.units.borrow().get(path) {
            return Ok(unit.clone());
        }
        if let Some(unit) = self.library_by_path(path) {
            return Ok(unit);
        }
        let text = fs::read_to_string(path).map_err(|source| ExtractError::SourceRead {
            path: path.to_path_buf(),
            source,
        })?;
        let unit = Rc::new(SourceUnit::parse(path.to_path_buf(), text, UnitKind::Source)?);
        self.units
            .borrow_mut()
            .insert(path.to_path_buf(), unit.clone());
        Ok(unit)
    }

    /// Register an in-memory file, replacing any previous unit with that path.
    pub fn add_virtual(
        &self,
        path: PathBuf,
        text: String,
        kind: UnitKind,
    ) -> Result<Rc<SourceUnit>, ExtractError> {
        let unit = Rc::new(SourceUnit::parse(path.clone(), text, kind)?);
        self.units.borrow_mut().insert(path, unit.clone());
        Ok(unit)
    }

    /// Already loaded unit at `path`.
    pub fn unit(&self, path: &Path) -> Option<Rc<SourceUnit>> {
        self.units
            .borrow()
            .get(path)
            .cloned()
            .or_else(|| self.library_by_path(path))
    }

    /// The bundled global declarations (`Array`, `Promise`, ...).
    pub fn globals(&self) -> Option<Rc<SourceUnit>> {
        self.library(GLOBALS_LIB)
    }

    /// Resolve `specifier` as imported from `from`.
    ///
    /// Relative specifiers resolve against the importing file with the usual
    /// TypeScript extensions. Bare specifiers resolve to bundled declaration
    /// files when one exists and are external otherwise.
    pub fn resolve_module(&self, from: &SourceUnit, specifier: &str) -> ModuleTarget {
        if !specifier.starts_with('.') && !specifier.starts_with('/') {
            return match self.library(specifier) {
                Some(unit) => ModuleTarget::Unit(unit),
                None => ModuleTarget::External(specifier.to_string()),
            };
        }

        let base = from.dir().join(specifier);
        let base = normalize(&base);
        for candidate in module_candidates(&base) {
            if let Some(unit) = self.try_load(&candidate) {
                return ModuleTarget::Unit(unit);
            }
        }
        ModuleTarget::External(specifier.to_string())
    }

    fn try_load(&self, path: &Path) -> Option<Rc<SourceUnit>> {
        if let Some(unit) = self.units.borrow().get(path) {
            return Some(unit.clone());
        }
        if self.unavailable.borrow().contains(path) || !path.is_file() {
            return None;
        }
        match self.load(path) {
            Ok(unit) => Some(unit),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "import not loaded");
                self.unavailable.borrow_mut().insert(path.to_path_buf());
                None
            }
        }
    }

    fn library(&self, name: &str) -> Option<Rc<SourceUnit>> {
        let (name, source) = LIBS.iter().find(|(lib, _)| *lib == name)?;
        let path = lib_path(name);
        if let Some(unit) = self.units.borrow().get(&path) {
            return Some(unit.clone());
        }
        match SourceUnit::parse(path.clone(), source.to_string(), UnitKind::Library) {
            Ok(unit) => {
                let unit = Rc::new(unit);
                self.units.borrow_mut().insert(path, unit.clone());
                Some(unit)
            }
            Err(err) => {
                debug!(lib = name, error = %err, "bundled declarations failed to parse");
                None
            }
        }
    }

    fn library_by_path(&self, path: &Path) -> Option<Rc<SourceUnit>> {
        let name = LIBS
            .iter()
            .map(|(name, _)| *name)
            .find(|name| lib_path(name) == path)?;
        self.library(name)
    }
}

fn lib_path(name: &str) -> PathBuf {
    PathBuf::from(format!("{}/{}.d.ts", LIB_ROOT, name))
}

fn module_candidates(base: &Path) -> Vec<PathBuf> {
    let raw = base.to_string_lossy();
    let mut candidates = Vec::new();
    if raw.ends_with(".ts") || raw.ends_with(".tsx") {
        candidates.push(base.to_path_buf());
    }
    for ext in ["ts", "tsx", "d.ts"] {
        candidates.push(PathBuf::from(format!("{}.{}", raw, ext)));
    }
    for index in ["index.ts", "index.tsx", "index.d.ts"] {
        candidates.push(base.join(index));
    }
    candidates
}

/// Collapse `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
