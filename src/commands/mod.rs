use chrono::Utc;
use std::{borrow::Cow, future::Future, pin::Pin, sync::Arc, time::Duration};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{
    config::EngineConfig,
    domain::{DomainEvent, Membership, PointsTransaction},
    ports::{
        database::{self, DatabasePort, MembershipStore, PointsUpdate},
        events::EventPublisher,
        tier,
    },
};

/// Implements [`tower::Service`] on [`DomainLogic`] for one operation
///
/// `$engine` borrows the engine while `$call` builds the [`CommandFuture`].
macro_rules! command_service {
    ($request:ty => $response:ty, |$engine:ident, $req:ident| $call:block) => {
        impl<D, T, P, E> tower::Service<$request> for $crate::commands::DomainLogic<D, T, P, E>
        where
            D: $crate::ports::database::DatabasePort + 'static,
            T: $crate::ports::tier::TierStore + 'static,
            P: $crate::ports::events::EventPublisher + 'static,
            E: $crate::commands::TierEvaluator + 'static,
        {
            type Response = $response;
            type Error = $crate::commands::Error;
            type Future = $crate::commands::CommandFuture<Self::Response>;

            fn poll_ready(
                &mut self,
                _cx: &mut std::task::Context<'_>,
            ) -> std::task::Poll<Result<(), Self::Error>> {
                std::task::Poll::Ready(Ok(()))
            }

            fn call(&mut self, $req: $request) -> Self::Future {
                let $engine = &*self;
                $call
            }
        }
    };
}

pub mod earn_points;
pub mod get_balance;
mod member_locks;
pub mod membership;
pub mod redeem_points;
pub mod tier_progression;
pub mod transactions;

use member_locks::MemberLocks;
pub use tier_progression::{TierCheck, TierEvaluator, TierProgression};

/// Boxed future returned by every command service
pub type CommandFuture<T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send>>;

/// The points engine
///
/// Each operation is a [`tower::Service`] implementation for its request type.
pub struct DomainLogic<D, T, P, E> {
    database: Arc<D>,
    tiers: Arc<T>,
    publisher: Arc<P>,
    evaluator: Arc<E>,
    locks: Arc<MemberLocks>,
    config: EngineConfig,
}

impl<D, T, P, E> DomainLogic<D, T, P, E> {
    pub fn new(
        database: Arc<D>,
        tiers: Arc<T>,
        publisher: Arc<P>,
        evaluator: Arc<E>,
        config: EngineConfig,
    ) -> Self {
        Self {
            database,
            tiers,
            publisher,
            evaluator,
            locks: Arc::default(),
            config,
        }
    }
}

impl<D, T, P> DomainLogic<D, T, P, TierProgression<D, T, P>> {
    /// Engine using the default tier evaluator over the same stores and publisher
    pub fn with_tier_progression(
        database: Arc<D>,
        tiers: Arc<T>,
        publisher: Arc<P>,
        config: EngineConfig,
    ) -> Self {
        let evaluator =
            TierProgression::new(database.clone(), tiers.clone(), publisher.clone(), &config);
        Self::new(database, tiers, publisher, Arc::new(evaluator), config)
    }
}

impl<D, T, P, E> Clone for DomainLogic<D, T, P, E> {
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            tiers: self.tiers.clone(),
            publisher: self.publisher.clone(),
            evaluator: self.evaluator.clone(),
            locks: self.locks.clone(),
            config: self.config.clone(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("member {0} does not exist")]
    MemberNotFound(Uuid),
    #[error("transaction {0} does not exist")]
    TransactionNotFound(Uuid),

    #[error("invalid argument: {0}")]
    InvalidArgument(Cow<'static, str>),

    /// Redeeming more points than the member holds
    #[error("insufficient points: {required} required, {available} available")]
    InsufficientPoints { required: i64, available: i64 },

    /// Storage or infrastructure failure
    ///
    /// The underlying error is logged, only a summary is kept here.
    #[error("internal error: {0}")]
    Internal(Cow<'static, str>),
}

impl From<database::Error> for Error {
    fn from(err: database::Error) -> Self {
        match err {
            database::Error::MemberNotFound(member_id) => Self::MemberNotFound(member_id),
            database::Error::TransactionNotFound(id) => Self::TransactionNotFound(id),
            database::Error::NegativePointsTotal {
                current_points,
                new_points,
            } => Self::InsufficientPoints {
                required: current_points - new_points,
                available: current_points,
            },
            err => {
                error!(error = %err, "database failure");
                Self::Internal(err.to_string().into())
            }
        }
    }
}

impl From<tier::Error> for Error {
    fn from(err: tier::Error) -> Self {
        error!(error = %err, "tier store failure");
        Self::Internal(err.to_string().into())
    }
}

fn validate_points(points: i64) -> Result<(), Error> {
    if points <= 0 {
        return Err(Error::InvalidArgument(
            format!("points must be positive, got {points}").into(),
        ));
    }
    Ok(())
}

fn validate_reference(name: &'static str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{name} is required").into()));
    }
    Ok(())
}

/// Reads the membership, builds a change from it and commits it
///
/// The whole sequence holds the member's lock, and the commit is conditional on the membership
/// version read at the start. Conflicting commits start over from a fresh read, up to
/// `max_attempts` times.
async fn commit_points<D, F>(
    database: &D,
    locks: &MemberLocks,
    max_attempts: u32,
    member_id: Uuid,
    mut build: F,
) -> Result<(PointsTransaction, Membership), Error>
where
    D: DatabasePort + ?Sized,
    F: FnMut(&Membership, chrono::DateTime<Utc>) -> Result<(PointsTransaction, PointsUpdate), Error>
        + Send,
{
    let _guard = locks.lock(member_id).await;

    for attempt in 1..=max_attempts {
        let membership = database.get_by_member(member_id).await?;
        let created_at = membership.next_timestamp(Utc::now());
        let (transaction, update) = build(&membership, created_at)?;

        match database
            .record_transaction(transaction.clone(), update)
            .await
        {
            Ok(membership) => return Ok((transaction, membership)),
            Err(database::Error::Conflict { .. }) => {
                debug!(%member_id, attempt, "concurrent points update, retrying");
            }
            Err(err) => return Err(err.into()),
        }
    }

    error!(%member_id, max_attempts, "giving up on conflicting points updates");
    Err(Error::Internal(
        format!("too many concurrent updates for member {member_id}").into(),
    ))
}

/// Publishes `event` in the background
///
/// The caller never waits on the publisher. Publication is bounded by `timeout`, errors are logged
/// and never retried.
fn publish_best_effort<P>(publisher: Arc<P>, event: DomainEvent, timeout: Duration)
where
    P: EventPublisher + ?Sized + 'static,
{
    tokio::spawn(async move {
        let topic = event.topic();
        match tokio::time::timeout(timeout, publisher.publish(topic.to_string(), event.payload()))
            .await
        {
            Ok(Ok(())) => debug!(topic, "event published"),
            Ok(Err(err)) => warn!(topic, error = %err, "failed to publish event"),
            Err(_) => warn!(topic, "timed out publishing event"),
        }
    });
}
