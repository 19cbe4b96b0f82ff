//! SQLite store for the PV sponsorship server.

pv_core::define_database!(Store, "Store migrations complete");
