//! Computation shapes: the closed set of cardinality variants the runtime assembles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rx::hooks::{HookSet, Transform};

/// Cardinality and timing variant of a deferred computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    /// No value; completion or error only.
    Action,
    /// Zero or one value.
    Optional,
    /// Exactly one value.
    Single,
    /// Zero to many values, pushed without backpressure.
    EagerStream,
    /// Zero to many values, pulled on demand.
    BackpressuredStream,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 5] = [
        ShapeKind::Action,
        ShapeKind::Optional,
        ShapeKind::Single,
        ShapeKind::EagerStream,
        ShapeKind::BackpressuredStream,
    ];

    /// Name of the runtime type assembled for this shape.
    pub fn type_name(&self) -> &'static str {
        match self {
            ShapeKind::Action => "Completable",
            ShapeKind::Optional => "Maybe",
            ShapeKind::Single => "Single",
            ShapeKind::EagerStream => "Observable",
            ShapeKind::BackpressuredStream => "Flowable",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Type-level marker for a [`ShapeKind`], selecting its hook slot.
pub trait Shape: Sized + Send + Sync + 'static {
    const KIND: ShapeKind;

    fn slot(hooks: &HookSet) -> &Option<Transform<Self>>;

    fn slot_mut(hooks: &mut HookSet) -> &mut Option<Transform<Self>>;
}

macro_rules! shape_marker {
    ($(#[$meta:meta])* $name:ident, $kind:expr, $field:ident) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub enum $name {}

        impl Shape for $name {
            const KIND: ShapeKind = $kind;

            fn slot(hooks: &HookSet) -> &Option<Transform<Self>> {
                &hooks.$field
            }

            fn slot_mut(hooks: &mut HookSet) -> &mut Option<Transform<Self>> {
                &mut hooks.$field
            }
        }
    };
}

shape_marker!(
    /// Marker for [`Completable`](crate::rx::Completable).
    Action,
    ShapeKind::Action,
    action
);
shape_marker!(
    /// Marker for [`Maybe`](crate::rx::Maybe).
    Optional,
    ShapeKind::Optional,
    optional
);
shape_marker!(
    /// Marker for [`Single`](crate::rx::Single).
    Single,
    ShapeKind::Single,
    single
);
shape_marker!(
    /// Marker for [`Observable`](crate::rx::Observable).
    EagerStream,
    ShapeKind::EagerStream,
    eager_stream
);
shape_marker!(
    /// Marker for [`Flowable`](crate::rx::Flowable).
    Backpressured,
    ShapeKind::BackpressuredStream,
    backpressured
);
