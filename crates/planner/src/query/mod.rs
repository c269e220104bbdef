use crate::query::{
    dialect::Dialect,
    renderer::{Render, Renderer},
};

pub mod ast;
pub mod dialect;
pub mod renderer;

/// Renders any statement node to SQL text for `dialect`.
pub fn to_sql<T: Render + ?Sized>(node: &T, dialect: &dyn Dialect) -> String {
    let mut renderer = Renderer::new(dialect);
    node.render(&mut renderer);
    renderer.finish()
}
