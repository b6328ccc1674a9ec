//! Per-codec plan cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::{resolve_handler, Codec, FieldHandler, Plan, PlanCell, PlanError, PlanLink};
use crate::schema::{ModelRef, Registry, SchemaError};

/// Builds and caches one [`Plan`] per model for codec `C`.
///
/// Builds are serialized behind the cache mutex. A model whose build is in
/// progress has an empty cell; embedded references to it bind to that cell
/// and see the plan once the outer build finishes. A failed build removes
/// every entry it inserted, so nothing half-built stays cached.
pub struct PlanCache<C: Codec> {
    registry: Registry,
    plans: Mutex<HashMap<ModelRef, PlanCell<C>>>,
}

struct Build<'a, C: Codec> {
    registry: &'a Registry,
    plans: &'a mut HashMap<ModelRef, PlanCell<C>>,
    inserted: Vec<ModelRef>,
}

impl<C: Codec> PlanCache<C> {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            plans: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the plan for `model`, building it (and any embedded plans)
    /// on first use.
    pub fn get(&self, model: &str) -> Result<Arc<Plan<C>>, PlanError> {
        let model = ModelRef::new(model);
        let mut plans = self.plans.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(plan) = plans.get(&model).and_then(|cell| cell.get()) {
            trace!(model = model.name(), codec = C::NAME, "plan cache hit");
            return Ok(Arc::clone(plan));
        }

        let mut build = Build {
            registry: &self.registry,
            plans: &mut *plans,
            inserted: Vec::new(),
        };
        match build.plan(&model) {
            Ok(plan) => Ok(plan),
            Err(err) => {
                for model in build.inserted {
                    plans.remove(&model);
                }
                Err(err)
            }
        }
    }

    /// Whether a finished plan for `model` is cached.
    pub fn contains(&self, model: &str) -> bool {
        let plans = self.plans.lock().unwrap_or_else(PoisonError::into_inner);
        plans
            .get(&ModelRef::new(model))
            .is_some_and(|cell| cell.get().is_some())
    }

    pub fn len(&self) -> usize {
        self.plans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: Codec> fmt::Debug for PlanCache<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanCache")
            .field("codec", &C::NAME)
            .field("plans_count", &self.len())
            .finish()
    }
}

impl<C: Codec> Build<'_, C> {
    fn plan(&mut self, model: &ModelRef) -> Result<Arc<Plan<C>>, PlanError> {
        let descriptor = self.registry.resolve(model.name())?;
        let cell: PlanCell<C> = Arc::new(OnceLock::new());
        self.plans.insert(model.clone(), Arc::clone(&cell));
        self.inserted.push(model.clone());

        let mut serialize = IndexMap::with_capacity(descriptor.len());
        let mut deserialize = IndexMap::with_capacity(descriptor.len());
        for field in descriptor.fields.values() {
            let handler = resolve_handler(&descriptor, field)?;
            let (encode, decode) = self.compile(&handler)?;
            serialize.insert(field.key.clone(), encode);
            deserialize.insert(field.key.clone(), decode);
        }

        let plan = Arc::new(Plan::new(Arc::clone(&descriptor), serialize, deserialize));
        let plan = Arc::clone(cell.get_or_init(|| plan));
        debug!(
            model = model.name(),
            fields = plan.len(),
            codec = C::NAME,
            "built codec plan"
        );
        Ok(plan)
    }

    fn compile(&mut self, handler: &FieldHandler) -> Result<(C::Encode, C::Decode), PlanError> {
        match handler {
            FieldHandler::Primitive(primitive) => Ok(C::primitive(*primitive)),
            FieldHandler::Model(model) => {
                if !self.plans.contains_key(model) {
                    self.plan(model)?;
                }
                match self.plans.get(model) {
                    Some(cell) => {
                        if cell.get().is_none() {
                            trace!(model = model.name(), codec = C::NAME, "deferred plan bind");
                        }
                        Ok(C::model(PlanLink::new(model.clone(), cell)))
                    }
                    None => Err(SchemaError::UnknownModel(model.name().to_string()).into()),
                }
            }
            FieldHandler::Array(element) => {
                let element = self.compile(element)?;
                Ok(C::array(element))
            }
        }
    }
}
