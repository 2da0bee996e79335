//! Bindings for the loan contract interface.

use alloy_sol_types::sol;

sol! {
    interface IMicroLoan {
        event LoanRequested(address indexed borrower, uint256 amount, uint256 repaymentPercent);
        event LoanApproved(address indexed borrower);
        event LoanRepaid(address indexed borrower, uint256 repaid, uint256 totalRepaid);
        event LoanCompleted(address indexed borrower);

        function loans(address borrower) external view returns (
            uint256 loanAmount,
            uint256 repaidAmount,
            uint256 repaymentPercent,
            bool isApproved,
            bool isCompleted
        );
        function checkLoanStatus(address borrower) external view returns (string);
        function owner() external view returns (address);

        function requestLoan(uint256 loanAmount, uint256 repaymentPercent) external;
        function approveLoan(address borrower) external;
        function repayLoan(uint256 income) external;
    }
}
