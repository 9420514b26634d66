//! Query builder and executor for one model variant.
//!
//! # Design
//! A `Collection` is `{model type, client, constraints}` and never changes
//! after construction: `filter`, `limit`, `offset` and friends return a new
//! collection, so one can be held as a reusable query template.
//!
//! Only `execute` has a side effect. `to_be_executed` is the pure request
//! it sends, which makes the request shape testable without a network.
//!
//! Pagination is computed on the client from `offset`/`limit`/`per_page`.
//! `find_each` stops on the first of: an empty page, `limit` reached, or a
//! page shorter than `per_page`.

use std::fmt;
use std::marker::PhantomData;

use serde_json::{Map, Value};
use tracing::debug;

use crate::client::Client;
use crate::constraints::Constraints;
use crate::error::{Error, Result};
use crate::http::Request;
use crate::model::{raise_if_read_only, require, Model};

pub struct Collection<'c, M> {
    client: &'c Client,
    constraints: Constraints,
    model: PhantomData<M>,
}

impl<'c, M: Model> Collection<'c, M> {
    /// A collection starting at offset 0 with the model's page size.
    pub fn new(client: &'c Client) -> Self {
        let mut constraints = Constraints::default().with_offset(0);
        if let Some(per_page) = M::PER_PAGE {
            constraints = constraints.with_per_page(per_page);
        }
        Self::with_constraints(client, constraints)
    }

    pub fn with_constraints(client: &'c Client, constraints: Constraints) -> Self {
        Self {
            client,
            constraints,
            model: PhantomData,
        }
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    fn derive(&self, delta: Constraints) -> Self {
        Self::with_constraints(self.client, self.constraints.merge(&delta))
    }

    /// Build an unsaved instance from `data`.
    pub fn new_instance(&self, data: &Map<String, Value>) -> Result<M> {
        M::from_hash(data)
    }

    /// Build an instance from `data` and save it.
    pub fn create(&self, data: &Map<String, Value>) -> Result<M> {
        raise_if_read_only::<M>()?;
        require::<M>(M::CAPABILITIES.creatable, "create")?;
        let mut instance = M::from_hash(data)?;
        instance.save(self.client)?;
        Ok(instance)
    }

    /// Narrow the query with attribute filters (the `where` clause).
    pub fn filter<K, V>(&self, filters: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        require::<M>(M::CAPABILITIES.searchable, "search")?;
        let delta = filters
            .into_iter()
            .fold(Constraints::default(), |delta, (key, value)| {
                delta.with_filter(key, value)
            });
        Ok(self.derive(delta))
    }

    pub fn limit(&self, quantity: u64) -> Self {
        self.derive(Constraints::default().with_limit(quantity))
    }

    pub fn offset(&self, start: u64) -> Self {
        self.derive(Constraints::default().with_offset(start))
    }

    pub fn per_page(&self, size: u64) -> Self {
        self.derive(Constraints::default().with_per_page(size))
    }

    pub fn view(&self, view: &str) -> Self {
        self.derive(Constraints::default().with_view(view))
    }

    /// Number of matching records, read from the `count` view's envelope.
    pub fn count(&self) -> Result<u64> {
        let response = self.view("count").execute()?;
        response
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::UnexpectedResponse(format!("expected a count, got {response}")))
    }

    pub fn first(&self) -> Result<Option<M>> {
        self.at(0)
    }

    /// The `index`-th record of the current page.
    pub fn at(&self, index: usize) -> Result<Option<M>> {
        let page = self.execute_page()?;
        page.get(index).map(M::from_value).transpose()
    }

    /// Records of one page, cast lazily. Each call re-executes the query.
    pub fn each(&self) -> Result<Each<M>> {
        Ok(Each::new(self.execute_page()?))
    }

    pub fn to_vec(&self) -> Result<Vec<M>> {
        self.each()?.collect()
    }

    /// Every matching record, fetching one page at a time as the iterator
    /// advances.
    pub fn find_each(&self) -> FindEach<'c, M> {
        FindEach {
            query: Some(self.clone()),
            page: Each::new(Vec::new()),
            accumulated: 0,
            yielded: 0,
            limit: self.constraints.limit(),
        }
    }

    pub fn more_pages<T>(&self, accumulated: u64, current_page: &[T]) -> bool {
        if current_page.is_empty() {
            return false;
        }
        if self
            .constraints
            .limit()
            .is_some_and(|limit| accumulated >= limit)
        {
            return false;
        }
        if self
            .constraints
            .per_page()
            .is_some_and(|per_page| (current_page.len() as u64) < per_page)
        {
            return false;
        }
        true
    }

    pub fn next_page<T>(&self, accumulated: u64, current_page: &[T]) -> Option<Self> {
        if !self.more_pages(accumulated, current_page) {
            return None;
        }
        let constraints = self.constraints.next_page()?;
        Some(Self::with_constraints(self.client, constraints))
    }

    /// Fetch one record by id. Constraints do not apply to single-record
    /// requests.
    pub fn find(&self, id: &str) -> Result<M> {
        let mut instance = M::new();
        instance.set("id", id)?;
        instance.reload(self.client)?;
        Ok(instance)
    }

    pub fn to_be_executed(&self) -> Request {
        Request::get(M::resources_path(self.client)).with_query(self.constraints.to_query())
    }

    pub fn execute(&self) -> Result<Value> {
        require::<M>(M::CAPABILITIES.listable, "list")?;
        self.client.execute(&self.to_be_executed())
    }

    fn execute_page(&self) -> Result<Vec<Value>> {
        match self.execute()? {
            Value::Array(records) => Ok(records),
            other => Err(Error::UnexpectedResponse(format!(
                "expected a list of {}, got {other}",
                M::model_name()
            ))),
        }
    }
}

impl<M> Clone for Collection<'_, M> {
    fn clone(&self) -> Self {
        Self {
            client: self.client,
            constraints: self.constraints.clone(),
            model: PhantomData,
        }
    }
}

impl<M: Model> fmt::Debug for Collection<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("model", &M::model_name())
            .field("constraints", &self.constraints)
            .finish()
    }
}

/// One page of raw records, cast as they are consumed.
pub struct Each<M> {
    records: std::vec::IntoIter<Value>,
    model: PhantomData<M>,
}

impl<M> Each<M> {
    fn new(records: Vec<Value>) -> Self {
        Self {
            records: records.into_iter(),
            model: PhantomData,
        }
    }
}

impl<M: Model> Iterator for Each<M> {
    type Item = Result<M>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next().map(|raw| M::from_value(&raw))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

/// Auto-paginating iterator returned by `Collection::find_each`.
///
/// The first error ends the iteration.
pub struct FindEach<'c, M> {
    query: Option<Collection<'c, M>>,
    page: Each<M>,
    accumulated: u64,
    yielded: u64,
    limit: Option<u64>,
}

impl<M: Model> FindEach<'_, M> {
    fn fetch_next_page(&mut self) -> Option<Result<()>> {
        let query = self.query.take()?;
        debug!(
            model = M::model_name(),
            offset = query.constraints().offset(),
            accumulated = self.accumulated,
            "fetching page"
        );
        match query.execute_page() {
            Ok(records) => {
                self.accumulated += records.len() as u64;
                self.query = query.next_page(self.accumulated, &records);
                self.page = Each::new(records);
                Some(Ok(()))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

impl<M: Model> Iterator for FindEach<'_, M> {
    type Item = Result<M>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.limit.is_some_and(|limit| self.yielded >= limit) {
            return None;
        }
        loop {
            if let Some(item) = self.page.next() {
                self.yielded += 1;
                if item.is_err() {
                    self.query = None;
                    self.page = Each::new(Vec::new());
                }
                return Some(item);
            }
            match self.fetch_next_page()? {
                Ok(()) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}
