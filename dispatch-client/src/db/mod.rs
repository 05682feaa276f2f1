pub mod dispatch_queries;
