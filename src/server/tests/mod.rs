mod isolation_proptest;
