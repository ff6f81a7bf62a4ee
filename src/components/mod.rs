pub mod supply_chain;
