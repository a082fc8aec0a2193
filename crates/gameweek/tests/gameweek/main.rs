mod helpers;
mod manager_test;
mod routes_test;
