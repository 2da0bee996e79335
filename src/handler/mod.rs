pub use self::{
    aggregator::LoanAggregator, dispatcher::ActionDispatcher,
    statistics::compute_statistics, status_task::status_task,
};

mod aggregator;
mod dispatcher;
mod statistics;
mod status_task;
